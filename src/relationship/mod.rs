//! Relationship state machine between users.
//!
//! Two edge kinds underlie every relationship:
//!
//! - A **follow edge** `(target, subscriber)` is a pending friend
//!   request: `subscriber` asked `target` for friendship and is waiting
//!   for an answer.
//! - A **friend edge** `{a, b}` is a confirmed, symmetric friendship.
//!   The pair is logically unordered; storage keeps it under a
//!   canonical ordering so exactly one row ever represents it.
//!
//! # Architecture
//!
//! ```text
//! RelationshipEngine (state machine + transitions)
//!     ├── UserDirectory (resolves external identifiers)
//!     └── RelationshipStore (SQLite for edge records)
//! ```
//!
//! # States
//!
//! From a viewer's perspective, another user is always in exactly one of
//! four states: [`RelationshipStatus::Strangers`], [`RelationshipStatus::Friends`],
//! [`RelationshipStatus::IncomingRequest`], or [`RelationshipStatus::OutgoingRequest`].
//! Edges are never mutated in place; transitions delete and create whole
//! rows, atomically where a transition touches both edge kinds.

mod engine;
mod error;
mod storage;
pub mod types;

pub use engine::RelationshipEngine;
pub use error::{RelationshipError, Result};
pub use storage::{RelationshipStore, SendOutcome};
pub use types::{FriendPair, RelationshipStatus, UserRef};
