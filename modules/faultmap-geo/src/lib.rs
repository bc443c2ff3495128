//! Administrative boundary reference data and coordinate → parish resolution.
//!
//! Boundaries are loaded once at startup and handed to [`ParishResolver`];
//! nothing in this crate holds global state.

pub mod boundaries;
pub mod resolver;

pub use boundaries::{BoundarySet, ParishBoundary, Polygon};
pub use resolver::{AreaMatch, ParishResolver};
