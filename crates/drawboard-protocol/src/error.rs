//! Error types for the protocol layer.
//!
//! Two enums live here. [`ProtocolError`] is about a value that can't be
//! turned into bytes. [`EventError`] is narrower: a drawing event whose
//! JSON parsed fine but doesn't fit the event schema.

/// Errors that can occur while encoding protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The encoded message is not valid at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Why a drawing event couldn't be parsed into the typed schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The `type` discriminator is missing, not a string, or not one of
    /// the five known event types. Carries what was found (empty when
    /// the field was absent).
    #[error("unknown event type: {0:?}")]
    UnknownEventType(String),

    /// The discriminator was fine but the payload doesn't match the shape
    /// that type requires, or the frame wasn't a JSON object at all.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
