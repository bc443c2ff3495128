use thiserror::Error;
use uuid::Uuid;

/// Submission or query input rejected before any state change.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid report type: {0}")]
    InvalidReportType(String),

    #[error("Invalid power source: {0}")]
    InvalidPowerSource(String),

    #[error("Coordinates ({lat}, {lng}) are outside the district")]
    OutOfBounds { lat: f64, lng: f64 },

    #[error("Unknown concelho: {0}")]
    UnknownConcelho(String),

    #[error("Parish {parish} is not part of concelho {concelho}")]
    UnknownParish { concelho: String, parish: String },
}

#[derive(Error, Debug)]
pub enum TriageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error("Report already resolved: {0}")]
    AlreadyResolved(Uuid),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
