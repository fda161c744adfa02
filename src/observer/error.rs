use std::time::Duration;
use thiserror::Error;

/// Observer system errors. Never surfaced to API callers; the pipeline logs and collects them.
#[derive(Debug, Error, Clone)]
pub enum ObserverError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("System error: {0}")]
    SystemError(String),
}

/// Outcome of notifying the pipeline about one change
#[derive(Debug, Clone, Default)]
pub struct ObserverResult {
    pub executed: Vec<&'static str>,
    pub errors: Vec<ObserverError>,
    pub execution_time: Duration,
}

impl ObserverResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<crate::database::manager::DatabaseError> for ObserverError {
    fn from(error: crate::database::manager::DatabaseError) -> Self {
        ObserverError::DatabaseError(error.to_string())
    }
}
