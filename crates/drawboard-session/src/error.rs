//! Error types for the persistence layer.

use uuid::Uuid;

/// Errors a [`DocumentStore`](crate::DocumentStore) backend can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was hit (e.g. an email already registered).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An update targeted a row that doesn't exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional write found the row changed since it was read.
    #[error("stale: {0}")]
    Stale(String),

    /// The backend couldn't be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from [`SessionStore`](crate::SessionStore).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// There is no refresh session for this user to rotate.
    #[error("no session found for user {0}")]
    NotFound(Uuid),

    /// The session no longer holds the hash the caller presented; another
    /// rotation got there first.
    #[error("session for user {0} was already rotated")]
    Stale(Uuid),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from [`EventArchive`](crate::EventArchive).
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// An event payload couldn't be re-serialized for storage.
    #[error("could not encode event: {0}")]
    Encode(#[from] drawboard_protocol::ProtocolError),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
