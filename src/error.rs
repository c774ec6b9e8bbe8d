use thiserror::Error;

/// Failures surfaced by the tracker core.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Empty title, malformed schedule name, or similar caller mistake.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The schedule has no table in the store.
    #[error("Schedule not found: {schedule}")]
    NotFound { schedule: String },

    /// Underlying SQLite failure. Never retried.
    #[error("Storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV failure: {0}")]
    Csv(#[from] csv::Error),
}

impl TrackerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(schedule: impl Into<String>) -> Self {
        Self::NotFound {
            schedule: schedule.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
