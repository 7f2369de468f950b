use thiserror::Error;

#[derive(Debug, Error)]
pub enum DebtError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Debt not found: {0}")]
    NotFound(String),

    #[error("A messaging contact is required before sending reminders")]
    ContactRequired,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Compose error: {0}")]
    Compose(String),
}

impl From<rusqlite::Error> for DebtError {
    fn from(err: rusqlite::Error) -> Self {
        DebtError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DebtError {
    fn from(err: serde_json::Error) -> Self {
        DebtError::Storage(err.to_string())
    }
}
