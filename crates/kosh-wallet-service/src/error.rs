//! Error types for vault operations

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input rejected by a precondition
    #[error("Validation error: {0}")]
    Validation(String),

    /// Required record missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Wrong password or PIN
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Operation needs an unlocked session
    #[error("Vault is locked")]
    Locked,

    /// Unreadable backup or record
    #[error("Format error: {0}")]
    Format(String),

    /// Storage layer error
    #[error(transparent)]
    Storage(#[from] kosh_storage::Error),

    /// Core error
    #[error(transparent)]
    Core(#[from] kosh_core::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Background task failed
    #[error("Task error: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Task(e.to_string())
    }
}
