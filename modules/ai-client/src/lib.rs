//! Provider client for constrained text classification.
//!
//! Callers hand over a piece of text and a closed label vocabulary; the
//! provider answers with exactly one of those labels or an error. Timeouts
//! and fallbacks are the caller's business.

pub mod claude;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use traits::LabelClassifier;
