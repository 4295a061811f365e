//! Core types for relationship tracking.
//!
//! [`UserRef`] is the only identity the relationship layer knows about:
//! an opaque, stable identifier issued by the external user directory.
//! This layer never creates or deletes users.

use serde::{Deserialize, Serialize};

/// Opaque reference to a user.
///
/// Wraps the stable identifier issued by the user directory. Two
/// `UserRef`s are the same user exactly when the wrapped identifiers
/// are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRef(String);

impl UserRef {
    /// Creates a user reference from a directory-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of an unordered user pair.
///
/// A friendship between `a` and `b` is logically unordered, but rows
/// are stored as ordered pairs. `FriendPair` sorts its two ends so that
/// `(a, b)` and `(b, a)` collapse to the same key, which means a single
/// lookup covers both orderings and at most one row can ever represent
/// a given pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FriendPair {
    lo: UserRef,
    hi: UserRef,
}

impl FriendPair {
    /// Builds the canonical pair for two users, in either order.
    #[must_use]
    pub fn new(a: &UserRef, b: &UserRef) -> Self {
        if a <= b {
            Self {
                lo: a.clone(),
                hi: b.clone(),
            }
        } else {
            Self {
                lo: b.clone(),
                hi: a.clone(),
            }
        }
    }

    /// The lexicographically smaller end.
    #[must_use]
    pub const fn lo(&self) -> &UserRef {
        &self.lo
    }

    /// The lexicographically larger end.
    #[must_use]
    pub const fn hi(&self) -> &UserRef {
        &self.hi
    }
}

/// Relationship status between a viewing user and another user.
///
/// Derived from the underlying edges, never stored. Exactly one status
/// applies to any pair at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    /// No edge in either direction.
    Strangers,
    /// A confirmed, symmetric friendship.
    Friends,
    /// The other user has sent the viewer a friend request.
    IncomingRequest,
    /// The viewer has sent the other user a friend request.
    OutgoingRequest,
}

impl RelationshipStatus {
    /// Converts to string representation for logging and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Strangers => "strangers",
            Self::Friends => "friends",
            Self::IncomingRequest => "incoming_request",
            Self::OutgoingRequest => "outgoing_request",
        }
    }

    /// The same status seen from the other side of the pair.
    #[must_use]
    pub const fn inverse(&self) -> Self {
        match self {
            Self::IncomingRequest => Self::OutgoingRequest,
            Self::OutgoingRequest => Self::IncomingRequest,
            Self::Strangers => Self::Strangers,
            Self::Friends => Self::Friends,
        }
    }
}

impl std::fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
