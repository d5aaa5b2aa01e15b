//! Typed schema for drawing events.
//!
//! Clients send drawing events as JSON objects with a `type` discriminator
//! and a `data` payload whose shape depends on the type:
//!
//! ```json
//! {"type":"shapeCreate","tool":"rect","timestamp":"1718000000",
//!  "data":{"color":"#f00","thickness":2,"x":10,"y":20,"width":30,"height":40}}
//! ```
//!
//! The live broadcast path never parses these. They're only decoded here
//! when a batch is archived, so a bad event is reported instead of being
//! stored as junk.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EventError, ProtocolError};

// ---------------------------------------------------------------------------
// EventType: the discriminator
// ---------------------------------------------------------------------------

/// The five kinds of drawing event.
///
/// On the wire these are camelCase strings (`"freehandDraw"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    FreehandDraw,
    ShapeCreate,
    TextAdd,
    ObjectDelete,
    BoardClear,
}

impl EventType {
    /// The wire name of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreehandDraw => "freehandDraw",
            Self::ShapeCreate => "shapeCreate",
            Self::TextAdd => "textAdd",
            Self::ObjectDelete => "objectDelete",
            Self::BoardClear => "boardClear",
        }
    }

    /// Looks up an event type by its wire name. Matching is exact.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "freehandDraw" => Some(Self::FreehandDraw),
            "shapeCreate" => Some(Self::ShapeCreate),
            "textAdd" => Some(Self::TextAdd),
            "objectDelete" => Some(Self::ObjectDelete),
            "boardClear" => Some(Self::BoardClear),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

/// A canvas coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A freehand stroke: a polyline in one colour and width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreehandDrawData {
    pub color: String,
    pub thickness: f64,
    pub points: Vec<Point>,
}

/// A rectangle-like shape anchored at `(x, y)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeCreateData {
    pub color: String,
    pub thickness: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A text label placed at `(x, y)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAddData {
    pub color: String,
    pub thickness: f64,
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// Removal of the object at `index` in the client's object list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDeleteData {
    pub index: i64,
}

/// The typed payload of a drawing event, one variant per [`EventType`].
///
/// This is a closed set: a payload can only be built from the shape its
/// type requires, and `BoardClear` carries nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    FreehandDraw(FreehandDrawData),
    ShapeCreate(ShapeCreateData),
    TextAdd(TextAddData),
    ObjectDelete(ObjectDeleteData),
    BoardClear,
}

impl EventPayload {
    /// The discriminator that belongs to this payload.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::FreehandDraw(_) => EventType::FreehandDraw,
            Self::ShapeCreate(_) => EventType::ShapeCreate,
            Self::TextAdd(_) => EventType::TextAdd,
            Self::ObjectDelete(_) => EventType::ObjectDelete,
            Self::BoardClear => EventType::BoardClear,
        }
    }

    /// Re-serializes the payload as JSON. `BoardClear` becomes `null`.
    pub fn to_data(&self) -> Result<Value, ProtocolError> {
        let value = match self {
            Self::FreehandDraw(data) => serde_json::to_value(data),
            Self::ShapeCreate(data) => serde_json::to_value(data),
            Self::TextAdd(data) => serde_json::to_value(data),
            Self::ObjectDelete(data) => serde_json::to_value(data),
            Self::BoardClear => Ok(Value::Null),
        };
        value.map_err(ProtocolError::Encode)
    }
}

// ---------------------------------------------------------------------------
// DrawingEvent
// ---------------------------------------------------------------------------

/// A fully parsed drawing event.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingEvent {
    /// Which tool produced the event (`"pen"`, `"rect"`, ...). Free-form;
    /// empty when the client didn't say.
    pub tool: String,
    /// Client-supplied timestamp, kept as text.
    pub timestamp: Option<String>,
    pub payload: EventPayload,
}

impl DrawingEvent {
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses one drawing event from raw JSON bytes.
///
/// # Errors
/// - [`EventError::MalformedPayload`] if the bytes aren't JSON, aren't an
///   object, or the payload doesn't fit its type.
/// - [`EventError::UnknownEventType`] if `type` is missing or unknown.
pub fn parse_event(bytes: &[u8]) -> Result<DrawingEvent, EventError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| EventError::MalformedPayload(e.to_string()))?;
    parse_event_value(value)
}

/// Parses one drawing event from an already-decoded JSON value.
///
/// The discriminator is read first; only then is `data` decoded, into
/// exactly the one shape that type names.
pub fn parse_event_value(value: Value) -> Result<DrawingEvent, EventError> {
    let Value::Object(mut map) = value else {
        return Err(EventError::MalformedPayload(
            "event is not a JSON object".into(),
        ));
    };

    let event_type = match map.get("type") {
        Some(Value::String(name)) => EventType::from_wire(name)
            .ok_or_else(|| EventError::UnknownEventType(name.clone()))?,
        Some(other) => return Err(EventError::UnknownEventType(other.to_string())),
        None => return Err(EventError::UnknownEventType(String::new())),
    };

    let tool = match map.remove("tool") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(tool)) => tool,
        Some(_) => {
            return Err(EventError::MalformedPayload(
                "tool must be a string".into(),
            ));
        }
    };

    // Clients send either an ISO string or epoch millis; both are kept
    // as text.
    let timestamp = match map.remove("timestamp") {
        None | Some(Value::Null) => None,
        Some(Value::String(ts)) => Some(ts),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(_) => {
            return Err(EventError::MalformedPayload(
                "timestamp must be a string or a number".into(),
            ));
        }
    };

    let data = map.remove("data").unwrap_or(Value::Null);
    let payload = match event_type {
        EventType::FreehandDraw => {
            EventPayload::FreehandDraw(decode_data(data, event_type)?)
        }
        EventType::ShapeCreate => {
            EventPayload::ShapeCreate(decode_data(data, event_type)?)
        }
        EventType::TextAdd => EventPayload::TextAdd(decode_data(data, event_type)?),
        EventType::ObjectDelete => {
            EventPayload::ObjectDelete(decode_data(data, event_type)?)
        }
        EventType::BoardClear => EventPayload::BoardClear,
    };

    Ok(DrawingEvent {
        tool,
        timestamp,
        payload,
    })
}

fn decode_data<T: DeserializeOwned>(
    data: Value,
    event_type: EventType,
) -> Result<T, EventError> {
    serde_json::from_value(data)
        .map_err(|e| EventError::MalformedPayload(format!("{event_type}: {e}")))
}
