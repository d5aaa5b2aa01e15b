//! Unified error type for the drawboard server.

use drawboard_hub::HubError;
use drawboard_transport::TransportError;

/// Top-level error for running the server.
///
/// The HTTP layer answers auth and archive failures itself, so only
/// what can stop a listener or a connection handler ends up here.
#[derive(Debug, thiserror::Error)]
pub enum DrawboardError {
    /// Connection, send, receive, or refused-upgrade failures.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The hub actor is gone.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// Binding a listener or serving HTTP failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
