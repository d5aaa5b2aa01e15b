//! Codec trait and implementations for serializing outgoing messages.
//!
//! A codec turns Rust types into raw bytes.
//! Callers only depend on the [`Codec`] trait, so the wire format can be
//! swapped without touching them. [`JsonCodec`] is the only one today,
//! which is what browsers speak anyway.

use serde::Serialize;

use crate::ProtocolError;

/// A codec that encodes Rust types to bytes.
///
/// `Send + Sync + 'static` because codecs get shared across Tokio tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use drawboard_protocol::{Codec, ControlFrame, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ControlFrame::TokenExpired).unwrap();
/// assert_eq!(bytes, br#"{"type":"TOKEN_EXPIRED"}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }
}
