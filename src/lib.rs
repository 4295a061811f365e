//! Friendgraph
//!
//! A library for modeling bidirectional friendships and directional
//! follow requests between users. The core is a relationship state
//! machine: a pending follow request either becomes a friendship
//! (accepted, or answered with a mutual request) or disappears
//! (declined, canceled), and the status between any two users is
//! always derivable as exactly one of four states.
//!
//! User accounts themselves live elsewhere: callers plug in a
//! [`directory::UserDirectory`] that resolves external identifiers to
//! opaque [`relationship::UserRef`]s.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod directory;
pub mod relationship;

pub use directory::{DirectoryError, InMemoryDirectory, RequestContext, UserDirectory};
pub use relationship::{
    RelationshipEngine, RelationshipError, RelationshipStatus, RelationshipStore, UserRef,
};
