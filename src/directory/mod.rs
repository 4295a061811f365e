//! User directory seam.
//!
//! The relationship layer never stores user accounts; it resolves
//! external identifiers (usernames, handles) to opaque [`UserRef`]s
//! through whatever directory service the embedding application
//! provides. This module defines that seam:
//!
//! - [`UserDirectory`]: the lookup contract.
//! - [`RequestContext`]: the authenticated identity of one request.
//! - [`InMemoryDirectory`]: a map-backed implementation for embedding
//!   in tests and small deployments.

mod error;

use std::collections::HashMap;

pub use error::{DirectoryError, Result};

use crate::relationship::UserRef;

/// Resolves external user identifiers to stable user references.
pub trait UserDirectory {
    /// Resolves an identifier to the user it names.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] if no such user exists.
    fn resolve(&self, identifier: &str) -> Result<UserRef>;
}

/// Authenticated identity carried by one request.
///
/// Handlers obtain the acting user through [`current_user`](Self::current_user);
/// anonymous requests fail with [`DirectoryError::Unauthorized`] before
/// any relationship operation runs.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    authenticated: Option<UserRef>,
}

impl RequestContext {
    /// Context for a request authenticated as `user`.
    #[must_use]
    pub const fn authenticated(user: UserRef) -> Self {
        Self {
            authenticated: Some(user),
        }
    }

    /// Context for an unauthenticated request.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            authenticated: None,
        }
    }

    /// Returns the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unauthorized`] if the request is
    /// anonymous.
    pub fn current_user(&self) -> Result<&UserRef> {
        self.authenticated
            .as_ref()
            .ok_or(DirectoryError::Unauthorized)
    }
}

/// Map-backed directory for tests and embedded use.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: HashMap<String, UserRef>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user under an identifier.
    ///
    /// Replaces any previous registration for the same identifier.
    pub fn insert(&mut self, identifier: impl Into<String>, user: UserRef) {
        self.users.insert(identifier.into(), user);
    }
}

impl UserDirectory for InMemoryDirectory {
    fn resolve(&self, identifier: &str) -> Result<UserRef> {
        self.users
            .get(identifier)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(identifier.to_string()))
    }
}
