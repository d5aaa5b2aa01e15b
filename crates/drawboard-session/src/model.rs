//! Persisted data shapes.

use chrono::{DateTime, Utc};
use drawboard_protocol::{DrawingEvent, EventType, ProtocolError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A registered account.
///
/// `email` is always stored normalized (see [`User::normalize_email`]);
/// `password_hash` is a PHC string and never the password itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    /// Trims surrounding whitespace and lower-cases the address, so
    /// `" Ada@Example.COM "` and `"ada@example.com"` are the same account.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Refresh sessions
// ---------------------------------------------------------------------------

/// SHA-256 of a refresh token, hex encoded.
///
/// The only way to build one from a live token is [`TokenHash::digest`],
/// so code holding a `TokenHash` can't accidentally be holding plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenHash(String);

impl TokenHash {
    /// Hashes a raw refresh token. Deterministic and one-way.
    pub fn digest(raw_token: &str) -> Self {
        Self(hex::encode(Sha256::digest(raw_token.as_bytes())))
    }

    /// The lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The three timestamps a session carries besides its creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimes {
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionTimes {
    /// A fresh window: created and used `now`, expiring `now + ttl`.
    pub fn starting_at(now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            created_at: now,
            last_used_at: now,
            expires_at: now + ttl,
        }
    }
}

/// A user's live refresh session. There is at most one per `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: TokenHash,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Builds a new session row with a fresh id.
    pub fn new(user_id: Uuid, token_hash: TokenHash, times: SessionTimes) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            created_at: times.created_at,
            last_used_at: times.last_used_at,
            expires_at: times.expires_at,
        }
    }

    /// `true` once `now` has reached `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// ---------------------------------------------------------------------------
// Archived events
// ---------------------------------------------------------------------------

/// One row of the event archive.
///
/// `data` is the typed payload serialized back to JSON (`null` for
/// `boardClear`), so what's stored always matches the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub tool: String,
    pub timestamp: Option<String>,
    pub data: serde_json::Value,
}

impl ArchivedEvent {
    pub fn from_event(event: &DrawingEvent) -> Result<Self, ProtocolError> {
        Ok(Self {
            event_type: event.event_type(),
            tool: event.tool.clone(),
            timestamp: event.timestamp.clone(),
            data: event.payload.to_data()?,
        })
    }
}
