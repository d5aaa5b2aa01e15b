//! The unit of data moved across a realtime connection.

use std::sync::Arc;

/// One message on the wire, forwarded verbatim.
///
/// The payload lives behind an `Arc` so fanning a frame out to many
/// clients clones a pointer, not the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A UTF-8 text message (what browsers send for JSON).
    Text(Arc<str>),
    /// An opaque binary message.
    Binary(Arc<[u8]>),
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Self::Text(Arc::from(text))
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Self::Text(Arc::from(text))
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(Arc::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_frame_from_str_and_string_match() {
        let from_str = Frame::from("{\"type\":\"boardClear\"}");
        let from_string = Frame::from(String::from("{\"type\":\"boardClear\"}"));
        assert_eq!(from_str, from_string);
        assert!(matches!(from_str, Frame::Text(_)));
    }

    #[test]
    fn test_clone_shares_payload() {
        let frame = Frame::from(vec![1u8, 2, 3]);
        let copy = frame.clone();
        match (&frame, &copy) {
            (Frame::Binary(a), Frame::Binary(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected binary frames"),
        }
    }
}
