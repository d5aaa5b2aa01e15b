//! Control frames: messages the server itself writes to a realtime socket.
//!
//! Everything else on the socket is a peer's drawing frame, forwarded
//! untouched. Control frames are the exception, so they get a real type.

use drawboard_transport::Frame;
use serde::Serialize;

use crate::{Codec, JsonCodec, ProtocolError};

/// A message originated by the server rather than by a peer.
///
/// `#[serde(tag = "type")]` puts the variant name inside the object, so
/// `TokenExpired` goes out as `{"type":"TOKEN_EXPIRED"}`, which is the
/// same discriminator key the drawing events use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ControlFrame {
    /// The access token this connection was opened with has run out.
    /// The server closes the socket right after sending it.
    #[serde(rename = "TOKEN_EXPIRED")]
    TokenExpired,
}

impl ControlFrame {
    /// Encodes the control frame as a text [`Frame`] with [`JsonCodec`].
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        let bytes = JsonCodec.encode(self)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;
        Ok(Frame::from(text))
    }
}
