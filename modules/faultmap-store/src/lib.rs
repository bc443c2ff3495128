//! Report persistence and outage telemetry access.
//!
//! The triage core talks to storage only through [`ReportStore`] and
//! [`OutageFeed`]. Counter updates happen inside the store as a single
//! statement; callers never read-modify-write a report.

pub mod memory;
pub mod migrate;
pub mod postgres;
pub mod traits;

pub use memory::{MemoryOutageFeed, MemoryReportStore};
pub use postgres::{PgOutageFeed, PgReportStore};
pub use traits::{OutageFeed, ReportCursor, ReportStore};
