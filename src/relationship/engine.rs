//! High-level relationship state machine.
//!
//! This module provides the [`RelationshipEngine`] which combines the
//! external user directory with [`RelationshipStore`] to classify the
//! relationship between two users and execute the transitions between
//! states.
//!
//! # State machine
//!
//! ```text
//!                 send_request                accept_request /
//! Strangers ────────────────────▶ Pending ────────────────────▶ Friends
//!     ▲                             │ │      mutual send_request    │
//!     │    cancel / decline         │ │                             │
//!     └─────────────────────────────┘ └──── unfriend ◀──────────────┘
//! ```
//!
//! Classification is a total function: Friends takes precedence, then
//! an incoming request, then an outgoing request, then strangers.

use tracing::{debug, info};

use super::error::{RelationshipError, Result};
use super::storage::{RelationshipStore, SendOutcome};
use super::types::{RelationshipStatus, UserRef};
use crate::directory::UserDirectory;

/// High-level API for relationship management.
///
/// Stateless logic over a shared persistent store: the engine itself
/// holds no relationship data and any number of request handlers may
/// share one instance.
///
/// # Example
///
/// ```ignore
/// use friendgraph::{InMemoryDirectory, RelationshipEngine, RelationshipStore};
///
/// let store = RelationshipStore::new(Path::new("/data/relationships.db"))?;
/// let engine = RelationshipEngine::new(store, directory);
/// engine.send_request(&alice, "bob")?;
/// ```
pub struct RelationshipEngine<D> {
    store: RelationshipStore,
    directory: D,
}

impl<D: UserDirectory> RelationshipEngine<D> {
    /// Creates a new engine over a store and a user directory.
    pub const fn new(store: RelationshipStore, directory: D) -> Self {
        Self { store, directory }
    }

    /// Resolves an external identifier through the directory.
    fn resolve(&self, identifier: &str) -> Result<UserRef> {
        Ok(self.directory.resolve(identifier)?)
    }

    // ==================== Classification ====================

    /// Classifies the relationship between `viewer` and the user named
    /// by `other`.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UserNotFound`] if `other` cannot be
    /// resolved, or another error if the store fails.
    pub fn classify(&self, viewer: &UserRef, other: &str) -> Result<RelationshipStatus> {
        let other = self.resolve(other)?;
        self.classify_refs(viewer, &other)
    }

    /// Classifies the relationship between two resolved users.
    ///
    /// Evaluation order enforces the single-status invariant: Friends
    /// first, then incoming, then outgoing, else strangers.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn classify_refs(&self, viewer: &UserRef, other: &UserRef) -> Result<RelationshipStatus> {
        let status = if self.store.has_friend_edge(viewer, other)? {
            RelationshipStatus::Friends
        } else if self.store.has_follow_edge(viewer, other)? {
            RelationshipStatus::IncomingRequest
        } else if self.store.has_follow_edge(other, viewer)? {
            RelationshipStatus::OutgoingRequest
        } else {
            RelationshipStatus::Strangers
        };

        debug!(viewer = %viewer, other = %other, status = status.as_str(), "classified relationship");
        Ok(status)
    }

    // ==================== Transitions ====================

    /// Sends a friend request from `actor` to the user named by `other`.
    ///
    /// If `other` already has a pending request to `actor`, the mutual
    /// request is treated as an acceptance: both edges are consumed and
    /// the two become friends immediately. Returns the resulting status
    /// from the actor's perspective ([`RelationshipStatus::OutgoingRequest`]
    /// or [`RelationshipStatus::Friends`]).
    ///
    /// The precondition read and the edge write share one store
    /// transaction, so two crossed concurrent sends serialize: one
    /// creates the pending request, the other observes it and promotes
    /// the pair to friends instead of inserting the reverse edge.
    ///
    /// # Errors
    ///
    /// - [`RelationshipError::UserNotFound`] if `other` cannot be resolved.
    /// - [`RelationshipError::AlreadyFriends`] if the two are friends.
    /// - [`RelationshipError::AlreadyRequested`] if a request is already
    ///   pending.
    /// - [`RelationshipError::Conflict`] on a self-request.
    pub fn send_request(&self, actor: &UserRef, other: &str) -> Result<RelationshipStatus> {
        let other_ref = self.resolve(other)?;
        if actor == &other_ref {
            return Err(RelationshipError::Conflict(
                "cannot send a friend request to yourself".to_string(),
            ));
        }

        match self.store.create_or_promote_follow_edge(&other_ref, actor)? {
            SendOutcome::AlreadyFriends => Err(RelationshipError::AlreadyFriends(other.to_string())),
            SendOutcome::AlreadyRequested => {
                Err(RelationshipError::AlreadyRequested(other.to_string()))
            }
            SendOutcome::AutoAccepted => {
                info!(actor = %actor, other = %other_ref, "mutual request auto-accepted");
                Ok(RelationshipStatus::Friends)
            }
            SendOutcome::Requested => {
                info!(actor = %actor, other = %other_ref, "friend request sent");
                Ok(RelationshipStatus::OutgoingRequest)
            }
        }
    }

    /// Cancels `actor`'s pending request to the user named by `other`.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UserNotFound`] if `other` cannot be
    /// resolved, or [`RelationshipError::NotFound`] if `actor` has no
    /// pending request to them.
    pub fn cancel_request(&self, actor: &UserRef, other: &str) -> Result<()> {
        let other_ref = self.resolve(other)?;
        self.store.delete_follow_edge(&other_ref, actor)?;
        info!(actor = %actor, other = %other_ref, "friend request canceled");
        Ok(())
    }

    /// Accepts a pending request from the user named by `other`.
    ///
    /// The request edge and the new friendship are swapped in a single
    /// store transaction, so no intermediate state is observable.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UserNotFound`] if `other` cannot be
    /// resolved, or [`RelationshipError::NotFound`] if they have no
    /// pending request to `actor`.
    pub fn accept_request(&self, actor: &UserRef, other: &str) -> Result<()> {
        let other_ref = self.resolve(other)?;
        self.store.promote_follow_to_friend(actor, &other_ref)?;
        info!(actor = %actor, other = %other_ref, "friend request accepted");
        Ok(())
    }

    /// Declines a pending request from the user named by `other`.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UserNotFound`] if `other` cannot be
    /// resolved, or [`RelationshipError::NotFound`] if they have no
    /// pending request to `actor`.
    pub fn decline_request(&self, actor: &UserRef, other: &str) -> Result<()> {
        let other_ref = self.resolve(other)?;
        self.store.delete_follow_edge(actor, &other_ref)?;
        info!(actor = %actor, other = %other_ref, "friend request declined");
        Ok(())
    }

    /// Removes the friendship between `actor` and the user named by
    /// `other`.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::UserNotFound`] if `other` cannot be
    /// resolved, or [`RelationshipError::NotFound`] if the two are not
    /// friends.
    pub fn unfriend(&self, actor: &UserRef, other: &str) -> Result<()> {
        let other_ref = self.resolve(other)?;
        self.store.delete_friend_edge(actor, &other_ref)?;
        info!(actor = %actor, other = %other_ref, "unfriended");
        Ok(())
    }

    // ==================== Listings ====================

    /// Lists all friends of `viewer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_friends(&self, viewer: &UserRef) -> Result<Vec<UserRef>> {
        self.store.list_friends(viewer)
    }

    /// Lists all users with a pending request to `viewer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_incoming(&self, viewer: &UserRef) -> Result<Vec<UserRef>> {
        self.store.list_incoming(viewer)
    }

    /// Lists all users `viewer` has a pending request to.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_outgoing(&self, viewer: &UserRef) -> Result<Vec<UserRef>> {
        self.store.list_outgoing(viewer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;

    fn create_test_engine(users: &[&str]) -> RelationshipEngine<InMemoryDirectory> {
        let mut directory = InMemoryDirectory::new();
        for name in users {
            directory.insert(*name, UserRef::new(*name));
        }
        RelationshipEngine::new(RelationshipStore::in_memory().unwrap(), directory)
    }

    fn user(id: &str) -> UserRef {
        UserRef::new(id)
    }

    // ==================== Classification ====================

    #[test]
    fn strangers_initially() {
        let engine = create_test_engine(&["alice", "bob"]);
        assert_eq!(
            engine.classify(&user("alice"), "bob").unwrap(),
            RelationshipStatus::Strangers
        );
    }

    #[test]
    fn classify_unknown_user_fails() {
        let engine = create_test_engine(&["alice"]);
        let err = engine.classify(&user("alice"), "ghost").unwrap_err();
        assert!(matches!(err, RelationshipError::UserNotFound(_)));
    }

    #[test]
    fn classify_is_symmetric_for_requests() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();

        assert_eq!(
            engine.classify(&user("alice"), "bob").unwrap(),
            RelationshipStatus::OutgoingRequest
        );
        assert_eq!(
            engine.classify(&user("bob"), "alice").unwrap(),
            RelationshipStatus::IncomingRequest
        );
    }

    // ==================== SendRequest ====================

    #[test]
    fn send_request_creates_outgoing() {
        let engine = create_test_engine(&["alice", "bob"]);
        let status = engine.send_request(&user("alice"), "bob").unwrap();
        assert_eq!(status, RelationshipStatus::OutgoingRequest);
    }

    #[test]
    fn send_request_twice_already_requested() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();

        let err = engine.send_request(&user("alice"), "bob").unwrap_err();
        assert!(matches!(err, RelationshipError::AlreadyRequested(_)));
    }

    #[test]
    fn send_request_to_friend_already_friends() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();
        engine.accept_request(&user("bob"), "alice").unwrap();

        let err = engine.send_request(&user("alice"), "bob").unwrap_err();
        assert!(matches!(err, RelationshipError::AlreadyFriends(_)));
    }

    #[test]
    fn send_request_to_unknown_user_fails() {
        let engine = create_test_engine(&["alice"]);
        let err = engine.send_request(&user("alice"), "ghost").unwrap_err();
        assert!(matches!(err, RelationshipError::UserNotFound(_)));
    }

    #[test]
    fn send_request_to_self_conflicts() {
        let engine = create_test_engine(&["alice"]);
        let err = engine.send_request(&user("alice"), "alice").unwrap_err();
        assert!(matches!(err, RelationshipError::Conflict(_)));
    }

    #[test]
    fn mutual_request_auto_accepts() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("bob"), "alice").unwrap();

        let status = engine.send_request(&user("alice"), "bob").unwrap();
        assert_eq!(status, RelationshipStatus::Friends);
        assert_eq!(
            engine.classify(&user("bob"), "alice").unwrap(),
            RelationshipStatus::Friends
        );
        assert!(engine.list_incoming(&user("alice")).unwrap().is_empty());
        assert!(engine.list_outgoing(&user("bob")).unwrap().is_empty());
    }

    // ==================== Cancel / Accept / Decline ====================

    #[test]
    fn cancel_request_returns_to_strangers() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();

        engine.cancel_request(&user("alice"), "bob").unwrap();
        assert_eq!(
            engine.classify(&user("alice"), "bob").unwrap(),
            RelationshipStatus::Strangers
        );
        assert!(engine.list_outgoing(&user("alice")).unwrap().is_empty());
        assert!(engine.list_incoming(&user("bob")).unwrap().is_empty());
    }

    #[test]
    fn cancel_without_request_not_found() {
        let engine = create_test_engine(&["alice", "bob"]);
        let err = engine.cancel_request(&user("alice"), "bob").unwrap_err();
        assert!(matches!(err, RelationshipError::NotFound(_)));
    }

    #[test]
    fn accept_request_makes_friends_both_ways() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();

        engine.accept_request(&user("bob"), "alice").unwrap();
        assert_eq!(
            engine.classify(&user("alice"), "bob").unwrap(),
            RelationshipStatus::Friends
        );
        assert_eq!(
            engine.classify(&user("bob"), "alice").unwrap(),
            RelationshipStatus::Friends
        );
        assert_eq!(engine.list_friends(&user("alice")).unwrap(), vec![user("bob")]);
        assert_eq!(engine.list_friends(&user("bob")).unwrap(), vec![user("alice")]);
    }

    #[test]
    fn accept_without_incoming_not_found() {
        let engine = create_test_engine(&["alice", "bob"]);
        let err = engine.accept_request(&user("bob"), "alice").unwrap_err();
        assert!(matches!(err, RelationshipError::NotFound(_)));
    }

    #[test]
    fn accept_own_outgoing_request_not_found() {
        // Only the target of a request may accept it.
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();

        let err = engine.accept_request(&user("alice"), "bob").unwrap_err();
        assert!(matches!(err, RelationshipError::NotFound(_)));
    }

    #[test]
    fn decline_request_returns_to_strangers() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();

        engine.decline_request(&user("bob"), "alice").unwrap();
        assert_eq!(
            engine.classify(&user("alice"), "bob").unwrap(),
            RelationshipStatus::Strangers
        );
    }

    #[test]
    fn decline_without_incoming_not_found() {
        let engine = create_test_engine(&["alice", "bob"]);
        let err = engine.decline_request(&user("bob"), "alice").unwrap_err();
        assert!(matches!(err, RelationshipError::NotFound(_)));
    }

    #[test]
    fn declined_subscriber_can_request_again() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();
        engine.decline_request(&user("bob"), "alice").unwrap();

        let status = engine.send_request(&user("alice"), "bob").unwrap();
        assert_eq!(status, RelationshipStatus::OutgoingRequest);
    }

    // ==================== Unfriend ====================

    #[test]
    fn unfriend_returns_to_strangers() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();
        engine.accept_request(&user("bob"), "alice").unwrap();

        engine.unfriend(&user("alice"), "bob").unwrap();
        assert_eq!(
            engine.classify(&user("alice"), "bob").unwrap(),
            RelationshipStatus::Strangers
        );
        assert_eq!(
            engine.classify(&user("bob"), "alice").unwrap(),
            RelationshipStatus::Strangers
        );
    }

    #[test]
    fn unfriend_twice_second_not_found() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();
        engine.accept_request(&user("bob"), "alice").unwrap();

        engine.unfriend(&user("alice"), "bob").unwrap();
        let err = engine.unfriend(&user("alice"), "bob").unwrap_err();
        assert!(matches!(err, RelationshipError::NotFound(_)));
    }

    #[test]
    fn either_side_may_unfriend() {
        let engine = create_test_engine(&["alice", "bob"]);
        engine.send_request(&user("alice"), "bob").unwrap();
        engine.accept_request(&user("bob"), "alice").unwrap();

        // bob accepted, so the stored row belongs to the pair in
        // canonical order; bob can still remove it.
        engine.unfriend(&user("bob"), "alice").unwrap();
        assert_eq!(
            engine.classify(&user("alice"), "bob").unwrap(),
            RelationshipStatus::Strangers
        );
    }

    #[test]
    fn unfriend_stranger_not_found() {
        let engine = create_test_engine(&["alice", "bob"]);
        let err = engine.unfriend(&user("alice"), "bob").unwrap_err();
        assert!(matches!(err, RelationshipError::NotFound(_)));
    }

    // ==================== Listings ====================

    #[test]
    fn listings_reflect_pending_requests() {
        let engine = create_test_engine(&["alice", "bob", "carol"]);
        engine.send_request(&user("alice"), "bob").unwrap();
        engine.send_request(&user("carol"), "bob").unwrap();

        assert_eq!(
            engine.list_incoming(&user("bob")).unwrap(),
            vec![user("alice"), user("carol")]
        );
        assert_eq!(engine.list_outgoing(&user("alice")).unwrap(), vec![user("bob")]);
        assert!(engine.list_friends(&user("bob")).unwrap().is_empty());
    }
}
