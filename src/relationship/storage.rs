//! `SQLite` storage for relationship edges.
//!
//! This module provides persistent storage for the two edge kinds the
//! engine builds on: directed follow edges (pending friend requests)
//! and unordered friend edges (confirmed friendships).
//!
//! # Uniqueness
//!
//! Friend edges are stored under the canonical ordering of
//! [`FriendPair`], so one row ever represents a given pair and the
//! `UNIQUE(user_lo, user_hi)` index rules out duplicates in either
//! direction. Follow edges are unique per exact `(target, subscriber)`
//! direction. Both indexes double as the race backstop: a concurrent
//! writer that loses gets a constraint violation, surfaced as
//! [`RelationshipError::Conflict`].

// SQLite operations need to hold the lock for the duration of the operation.
// Dropping the guard earlier would require restructuring all methods.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, TransactionBehavior};

use super::error::{RelationshipError, Result};
use super::types::{FriendPair, UserRef};

/// `SQLite`-based storage for relationship edges.
///
/// Thread-safe wrapper around a `SQLite` connection. All mutation
/// methods are atomic: single statements rely on `SQLite`'s statement
/// atomicity, and the one compound mutation
/// ([`promote_follow_to_friend`](Self::promote_follow_to_friend)) runs
/// inside an immediate transaction.
pub struct RelationshipStore {
    conn: Mutex<Connection>,
}

impl RelationshipStore {
    /// Creates a new store at the given path.
    ///
    /// Creates the database file and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RelationshipError::Storage(format!("Failed to acquire database lock: {e}")))
    }

    /// Initializes the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            -- Confirmed friendships, one row per unordered pair.
            -- Rows always satisfy user_lo < user_hi (FriendPair canonical order).
            CREATE TABLE IF NOT EXISTS friend_edges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_lo TEXT NOT NULL,
                user_hi TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (user_lo, user_hi)
            );

            -- Pending friend requests: subscriber asked target.
            CREATE TABLE IF NOT EXISTS follow_edges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                target TEXT NOT NULL,
                subscriber TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (target, subscriber)
            );
            ",
        )?;

        Ok(())
    }

    // ==================== Friend Edges ====================

    /// Returns whether a friend edge exists between the two users, in
    /// either order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn has_friend_edge(&self, a: &UserRef, b: &UserRef) -> Result<bool> {
        let pair = FriendPair::new(a, b);
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM friend_edges WHERE user_lo = ?1 AND user_hi = ?2",
            params![pair.lo().as_str(), pair.hi().as_str()],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// Creates a friend edge between the two users.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::Conflict`] if an edge already exists
    /// for the pair (in either order), or another error if the database
    /// operation fails.
    pub fn create_friend_edge(&self, a: &UserRef, b: &UserRef) -> Result<()> {
        let pair = FriendPair::new(a, b);
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO friend_edges (user_lo, user_hi, created_at) VALUES (?1, ?2, ?3)",
            params![
                pair.lo().as_str(),
                pair.hi().as_str(),
                chrono::Utc::now().timestamp(),
            ],
        )
        .map_err(|e| map_unique_violation(e, || format!("friend edge {a} / {b} already exists")))?;

        Ok(())
    }

    /// Deletes the friend edge between the two users, whichever order
    /// it was requested in.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::NotFound`] if no edge exists for
    /// the pair, or another error if the database operation fails.
    pub fn delete_friend_edge(&self, a: &UserRef, b: &UserRef) -> Result<()> {
        let pair = FriendPair::new(a, b);
        let conn = self.lock()?;

        let rows = conn.execute(
            "DELETE FROM friend_edges WHERE user_lo = ?1 AND user_hi = ?2",
            params![pair.lo().as_str(), pair.hi().as_str()],
        )?;

        if rows == 0 {
            return Err(RelationshipError::NotFound(format!(
                "no friend edge between {a} and {b}"
            )));
        }

        Ok(())
    }

    /// Lists all friends of a user.
    ///
    /// Merges both stored sides of the canonical pair into one result
    /// with no duplicates, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_friends(&self, user: &UserRef) -> Result<Vec<UserRef>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT user_hi AS friend FROM friend_edges WHERE user_lo = ?1
            UNION
            SELECT user_lo FROM friend_edges WHERE user_hi = ?1
            ORDER BY friend
            ",
        )?;

        let friends = stmt
            .query_map(params![user.as_str()], |row| {
                let id: String = row.get(0)?;
                Ok(UserRef::new(id))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(friends)
    }

    // ==================== Follow Edges ====================

    /// Returns whether a follow edge exists for this exact direction:
    /// `subscriber` has a pending request to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn has_follow_edge(&self, target: &UserRef, subscriber: &UserRef) -> Result<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follow_edges WHERE target = ?1 AND subscriber = ?2",
            params![target.as_str(), subscriber.as_str()],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// Creates a follow edge: `subscriber` requests friendship with
    /// `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::Conflict`] if this exact directed
    /// edge already exists, or another error if the database operation
    /// fails.
    pub fn create_follow_edge(&self, target: &UserRef, subscriber: &UserRef) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO follow_edges (target, subscriber, created_at) VALUES (?1, ?2, ?3)",
            params![
                target.as_str(),
                subscriber.as_str(),
                chrono::Utc::now().timestamp(),
            ],
        )
        .map_err(|e| {
            map_unique_violation(e, || {
                format!("follow edge from {subscriber} to {target} already exists")
            })
        })?;

        Ok(())
    }

    /// Deletes the follow edge from `subscriber` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::NotFound`] if the edge is absent,
    /// or another error if the database operation fails.
    pub fn delete_follow_edge(&self, target: &UserRef, subscriber: &UserRef) -> Result<()> {
        let conn = self.lock()?;

        let rows = conn.execute(
            "DELETE FROM follow_edges WHERE target = ?1 AND subscriber = ?2",
            params![target.as_str(), subscriber.as_str()],
        )?;

        if rows == 0 {
            return Err(RelationshipError::NotFound(format!(
                "no follow edge from {subscriber} to {target}"
            )));
        }

        Ok(())
    }

    /// Lists all users with a pending request to `user` (requests sent
    /// to `user`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_incoming(&self, user: &UserRef) -> Result<Vec<UserRef>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT subscriber FROM follow_edges WHERE target = ?1 ORDER BY subscriber",
        )?;

        let subscribers = stmt
            .query_map(params![user.as_str()], |row| {
                let id: String = row.get(0)?;
                Ok(UserRef::new(id))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(subscribers)
    }

    /// Lists all users `user` has a pending request to.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_outgoing(&self, user: &UserRef) -> Result<Vec<UserRef>> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT target FROM follow_edges WHERE subscriber = ?1 ORDER BY target")?;

        let targets = stmt
            .query_map(params![user.as_str()], |row| {
                let id: String = row.get(0)?;
                Ok(UserRef::new(id))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(targets)
    }

    // ==================== Compound Mutations ====================

    /// Applies the send-request mutation for `subscriber` asking
    /// `target`, in one transaction.
    ///
    /// The pair's current edges are re-read inside the same immediate
    /// transaction that writes, so two crossed concurrent sends cannot
    /// both observe an empty pair: the second send sees the first one's
    /// follow edge and promotes it instead of inserting the reverse
    /// direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails. Finding the
    /// pair already related is not an error here; it is reported
    /// through [`SendOutcome`] for the engine to map.
    pub fn create_or_promote_follow_edge(
        &self,
        target: &UserRef,
        subscriber: &UserRef,
    ) -> Result<SendOutcome> {
        let pair = FriendPair::new(target, subscriber);
        let mut conn = self.lock()?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let friends: i64 = tx.query_row(
            "SELECT COUNT(*) FROM friend_edges WHERE user_lo = ?1 AND user_hi = ?2",
            params![pair.lo().as_str(), pair.hi().as_str()],
            |row| row.get(0),
        )?;
        if friends > 0 {
            return Ok(SendOutcome::AlreadyFriends);
        }

        let outgoing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM follow_edges WHERE target = ?1 AND subscriber = ?2",
            params![target.as_str(), subscriber.as_str()],
            |row| row.get(0),
        )?;
        if outgoing > 0 {
            return Ok(SendOutcome::AlreadyRequested);
        }

        // Reverse direction pending means the target already asked the
        // subscriber: a mutual request implies friendship.
        let incoming = tx.execute(
            "DELETE FROM follow_edges WHERE target = ?1 AND subscriber = ?2",
            params![subscriber.as_str(), target.as_str()],
        )?;
        if incoming > 0 {
            tx.execute(
                "INSERT INTO friend_edges (user_lo, user_hi, created_at) VALUES (?1, ?2, ?3)",
                params![
                    pair.lo().as_str(),
                    pair.hi().as_str(),
                    chrono::Utc::now().timestamp(),
                ],
            )
            .map_err(|e| {
                map_unique_violation(e, || {
                    format!("friend edge {target} / {subscriber} already exists")
                })
            })?;
            tx.commit()?;
            return Ok(SendOutcome::AutoAccepted);
        }

        tx.execute(
            "INSERT INTO follow_edges (target, subscriber, created_at) VALUES (?1, ?2, ?3)",
            params![
                target.as_str(),
                subscriber.as_str(),
                chrono::Utc::now().timestamp(),
            ],
        )
        .map_err(|e| {
            map_unique_violation(e, || {
                format!("follow edge from {subscriber} to {target} already exists")
            })
        })?;

        tx.commit()?;
        Ok(SendOutcome::Requested)
    }

    /// Consumes the follow edge from `subscriber` to `target` and
    /// creates the friend edge for the pair, in one transaction.
    ///
    /// Backs both `AcceptRequest` and the mutual-request auto-accept.
    /// The reverse follow direction is cleared in the same scope, so a
    /// friend edge never coexists with a follow edge between the pair.
    /// On any failure the transaction rolls back entirely.
    ///
    /// # Errors
    ///
    /// Returns [`RelationshipError::NotFound`] if the follow edge is
    /// absent, [`RelationshipError::Conflict`] if a friend edge already
    /// exists, or another error if the database operation fails.
    pub fn promote_follow_to_friend(&self, target: &UserRef, subscriber: &UserRef) -> Result<()> {
        let pair = FriendPair::new(target, subscriber);
        let mut conn = self.lock()?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows = tx.execute(
            "DELETE FROM follow_edges WHERE target = ?1 AND subscriber = ?2",
            params![target.as_str(), subscriber.as_str()],
        )?;
        if rows == 0 {
            return Err(RelationshipError::NotFound(format!(
                "no follow edge from {subscriber} to {target}"
            )));
        }

        // Reverse direction, if a crossed request slipped in.
        tx.execute(
            "DELETE FROM follow_edges WHERE target = ?1 AND subscriber = ?2",
            params![subscriber.as_str(), target.as_str()],
        )?;

        tx.execute(
            "INSERT INTO friend_edges (user_lo, user_hi, created_at) VALUES (?1, ?2, ?3)",
            params![
                pair.lo().as_str(),
                pair.hi().as_str(),
                chrono::Utc::now().timestamp(),
            ],
        )
        .map_err(|e| {
            map_unique_violation(e, || {
                format!("friend edge {target} / {subscriber} already exists")
            })
        })?;

        tx.commit()?;
        Ok(())
    }
}

/// Outcome of [`RelationshipStore::create_or_promote_follow_edge`].
///
/// Observed-state outcomes (`AlreadyFriends`, `AlreadyRequested`) are
/// values rather than errors: the store surfaces what it found, and
/// the engine decides which business-rule error they map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// No prior edge existed: the follow edge was created.
    Requested,
    /// The reverse request was pending and has been promoted to a
    /// friendship.
    AutoAccepted,
    /// A friend edge already exists; nothing changed.
    AlreadyFriends,
    /// This exact follow edge already exists; nothing changed.
    AlreadyRequested,
}

/// Translates a UNIQUE constraint violation into a [`RelationshipError::Conflict`]
/// with a domain message; passes every other error through as `Database`.
fn map_unique_violation(
    err: rusqlite::Error,
    message: impl FnOnce() -> String,
) -> RelationshipError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            RelationshipError::Conflict(message())
        }
        _ => RelationshipError::Database(err),
    }
}
