//! Wire protocol for the shared drawboard.
//!
//! The live path never looks inside a drawing frame; it forwards bytes.
//! What this crate defines is everything that *does* need a shape:
//!
//! - **Control frames** ([`ControlFrame`]): the few messages the server
//!   itself sends down a socket, like `{"type":"TOKEN_EXPIRED"}`.
//! - **Event schema** ([`DrawingEvent`], [`EventPayload`], [`parse_event`]):
//!   the typed view of a drawing event, used only when archiving.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how typed values turn
//!   into bytes.
//! - **Errors** ([`ProtocolError`], [`EventError`]).
//!
//! ```text
//! Transport (Frame) → Protocol (ControlFrame / DrawingEvent) → Session (archive)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod control;
mod error;
mod event;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, JsonCodec};
pub use control::ControlFrame;
pub use error::{EventError, ProtocolError};
pub use event::{
    DrawingEvent, EventPayload, EventType, FreehandDrawData, ObjectDeleteData,
    Point, ShapeCreateData, TextAddData, parse_event, parse_event_value,
};
