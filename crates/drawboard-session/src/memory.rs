//! In-memory [`DocumentStore`] backend.
//!
//! All three tables sit behind one `tokio::sync::RwLock`, so every method
//! is a single critical section. That's what makes "check the email is
//! free, then insert" and "replace the user's session" atomic here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    ArchivedEvent, DocumentStore, Session, SessionTimes, StoreError, TokenHash,
    User,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    /// Normalized email → user id. Kept in sync with `users`.
    emails: HashMap<String, Uuid>,
    /// Keyed by `user_id`, which is what keeps it to one row per user.
    sessions: HashMap<Uuid, Session>,
    events: Vec<ArchivedEvent>,
}

/// A [`DocumentStore`] that keeps everything in process memory.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.emails.contains_key(&user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn upsert_session(&self, session: Session) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(previous) = tables.sessions.insert(session.user_id, session) {
            tracing::debug!(user_id = %previous.user_id, session_id = %previous.id, "replaced session");
        }
        Ok(())
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        expected: &TokenHash,
        token_hash: TokenHash,
        times: SessionTimes,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let session = tables
            .sessions
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("session for user {user_id}")))?;
        if session.token_hash != *expected {
            return Err(StoreError::Stale(format!("session for user {user_id}")));
        }
        session.token_hash = token_hash;
        session.created_at = times.created_at;
        session.last_used_at = times.last_used_at;
        session.expires_at = times.expires_at;
        Ok(())
    }

    async fn find_session(&self, user_id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.tables.read().await.sessions.get(&user_id).cloned())
    }

    async fn count_sessions(&self, user_id: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .count())
    }

    async fn insert_events(&self, events: Vec<ArchivedEvent>) -> Result<usize, StoreError> {
        let count = events.len();
        self.tables.write().await.events.extend(events);
        Ok(count)
    }

    async fn list_events(&self) -> Result<Vec<ArchivedEvent>, StoreError> {
        Ok(self.tables.read().await.events.clone())
    }
}
