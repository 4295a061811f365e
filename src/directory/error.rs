//! Error types for user directory lookups.

use thiserror::Error;

/// Error type for directory operations.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// No user with the given identifier.
    #[error("User not found: {0}")]
    NotFound(String),

    /// The request carries no authenticated user.
    #[error("Unauthorized")]
    Unauthorized,
}

/// Result type alias for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;
