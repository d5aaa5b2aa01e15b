//! Refresh-session bookkeeping on top of a [`DocumentStore`].
//!
//! A user has at most one live refresh session. Signing in replaces it,
//! refreshing rewrites it in place, and nothing here ever sees a refresh
//! token in plaintext: every write takes a [`TokenHash`].

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{DocumentStore, Session, SessionError, SessionTimes, StoreError, TokenHash};

/// Thin session CRUD over a shared document store.
#[derive(Debug, Clone)]
pub struct SessionStore<S> {
    store: S,
}

impl<S: DocumentStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Drops whatever session the user had and starts a new one.
    ///
    /// This is one upsert at the store, so two signins racing each other
    /// still leave exactly one row. Returns the new session's id.
    pub async fn clear_and_create(
        &self,
        user_id: Uuid,
        token_hash: TokenHash,
        times: SessionTimes,
    ) -> Result<Uuid, SessionError> {
        let session = Session::new(user_id, token_hash, times);
        let id = session.id;
        self.store.upsert_session(session).await?;
        tracing::debug!(%user_id, session_id = %id, "session created");
        Ok(id)
    }

    /// Swaps the user's refresh hash from `presented` to `new_hash` and
    /// restarts its lifetime window at `now`. The previous refresh token
    /// stops matching immediately, and a second rotation with the same
    /// `presented` hash fails.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if the user has no session to rotate.
    /// - [`SessionError::Stale`] if the session no longer holds `presented`.
    pub async fn rotate(
        &self,
        user_id: Uuid,
        presented: &TokenHash,
        new_hash: TokenHash,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let times = SessionTimes::starting_at(now, ttl);
        match self.store.update_session(user_id, presented, new_hash, times).await {
            Ok(()) => {
                tracing::debug!(%user_id, "session rotated");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(SessionError::NotFound(user_id)),
            Err(StoreError::Stale(_)) => Err(SessionError::Stale(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// The user's live session row, if there is one.
    pub async fn current(&self, user_id: Uuid) -> Result<Option<Session>, SessionError> {
        Ok(self.store.find_session(user_id).await?)
    }
}
