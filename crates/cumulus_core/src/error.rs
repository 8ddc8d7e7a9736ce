//! Operation layer error types

use cumulus_store::StoreError;
use thiserror::Error;

/// Main operation error type
#[derive(Error, Debug)]
pub enum CoreError {
    // ===== Validation (reported before any I/O) =====
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // ===== Conflict and existence policy =====
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    // ===== Identity =====
    #[error("username already taken: {0}")]
    DuplicateUser(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("wrong password")]
    WrongPassword,

    // ===== Lower layers =====
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("malformed user document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Store(StoreError::Io(e))
    }
}

/// Reject blank required fields, the analogue of a missing value.
pub(crate) fn required_field(value: &str, field: &str) -> crate::Result<String> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidArgument(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(value.to_string())
}
