//! Error types for relationship operations.
//!
//! Structural errors (`NotFound`, `Conflict`, database failures) come
//! from the storage layer; business-rule errors (`AlreadyFriends`,
//! `AlreadyRequested`) are added by the engine after classifying the
//! current state. Every failed precondition maps to a distinct variant
//! so callers can render distinct messages.

use thiserror::Error;

use crate::directory::DirectoryError;

/// Error type for relationship operations.
#[derive(Error, Debug)]
pub enum RelationshipError {
    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Storage operation failed (lock poisoning and similar).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Referenced user could not be resolved.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Referenced relationship edge does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness invariant would be violated, or a concurrent
    /// transition won the race.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The users are already friends.
    #[error("Already friends with {0}")]
    AlreadyFriends(String),

    /// A friend request to this user is already pending.
    #[error("Friend request to {0} already sent")]
    AlreadyRequested(String),

    /// No authenticated actor.
    #[error("Unauthorized")]
    Unauthorized,
}

/// Result type alias for relationship operations.
pub type Result<T> = std::result::Result<T, RelationshipError>;

impl From<DirectoryError> for RelationshipError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(identifier) => Self::UserNotFound(identifier),
            DirectoryError::Unauthorized => Self::Unauthorized,
        }
    }
}
