pub mod types;
pub mod config;
pub mod error;
pub mod text;

pub use types::*;
pub use config::Config;
pub use error::{TriageError, ValidationError};
pub use text::{clean_optional, truncate_chars};
