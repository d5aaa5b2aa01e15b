//! The document store contract.
//!
//! Everything above this crate reaches persistence through
//! [`DocumentStore`]. It covers the handful of reads and
//! writes the auth flows and the archive need, with the two uniqueness
//! rules (one account per email, one session per user) enforced by the
//! store itself, where concurrent requests can't race past them.

use uuid::Uuid;

use crate::{ArchivedEvent, Session, SessionTimes, StoreError, TokenHash, User};

/// Async CRUD over users, sessions, and archived events.
///
/// Methods return `impl Future + Send` so implementations can be used from
/// any Tokio task; an `async fn` in the impl block satisfies them.
pub trait DocumentStore: Send + Sync + 'static {
    /// Inserts a new user.
    ///
    /// # Errors
    /// [`StoreError::Conflict`] if a user with the same email exists.
    fn insert_user(
        &self,
        user: User,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Looks a user up by (already normalized) email.
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    fn find_user_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    /// Writes `session` as the only session of its user, replacing any
    /// existing one in a single step.
    fn upsert_session(
        &self,
        session: Session,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Rewrites the hash and timestamps of the user's session in place,
    /// but only while it still holds `expected`. The check and the write
    /// are one step, so of two writers holding the same hash exactly one
    /// wins.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if the user has no session.
    /// - [`StoreError::Stale`] if the stored hash isn't `expected`.
    fn update_session(
        &self,
        user_id: Uuid,
        expected: &TokenHash,
        token_hash: TokenHash,
        times: SessionTimes,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns the user's session, if any.
    fn find_session(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<Session>, StoreError>> + Send;

    /// Number of session rows held for `user_id`. Always 0 or 1 for a
    /// store that honours the contract.
    fn count_sessions(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Appends events in the given order and returns how many were written.
    fn insert_events(
        &self,
        events: Vec<ArchivedEvent>,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// All archived events, oldest first.
    fn list_events(
        &self,
    ) -> impl Future<Output = Result<Vec<ArchivedEvent>, StoreError>> + Send;
}
