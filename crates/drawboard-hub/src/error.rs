//! Error types for the hub.

/// Errors returned by [`HubHandle`](crate::HubHandle) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The hub actor has stopped; nothing can be registered or broadcast.
    #[error("hub is unavailable")]
    Unavailable,
}
