//! Type definitions shared by fake requests and the registry.

use super::core::FakeRequest;
use crate::error::{FakeRequestError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Conventional response keys
// ============================================================================

pub const STATUS_KEY: &str = "status";
pub const STATUS_TEXT_KEY: &str = "statusText";
pub const RESPONSE_KEY: &str = "response";
pub const RESPONSE_TEXT_KEY: &str = "responseText";
pub const RESPONSE_HEADERS_KEY: &str = "responseHeaders";

/// Status applied by `respond` when neither the payload nor an earlier
/// terminal call set one
pub const DEFAULT_RESPOND_STATUS: u16 = 200;

// ============================================================================
// Ready State
// ============================================================================

/// XHR `readyState` values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReadyState {
    #[default]
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

impl ReadyState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Load,
    Error,
    Abort,
    /// Accepted by `add_event_listener` but never fired by a terminal call
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Load => "load",
            EventType::Error => "error",
            EventType::Abort => "abort",
            EventType::Other(name) => name,
        }
    }
}

impl FromStr for EventType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.strip_prefix("on").unwrap_or(s);
        Ok(match name.to_ascii_lowercase().as_str() {
            "load" => EventType::Load,
            "error" => EventType::Error,
            "abort" => EventType::Abort,
            other => EventType::Other(other.to_string()),
        })
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(event_type) => event_type,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthetic event handed to handlers. `target` is the request that fired it.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub target: FakeRequest,
}

pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

// ============================================================================
// Response Payload
// ============================================================================

/// Open string-keyed response record.
///
/// Merged key by key into a request on `respond`/`fail`/`abort`. Unknown keys
/// are kept and readable through `FakeRequest::field`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseData(Map<String, Value>);

impl ResponseData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: u16) -> Self {
        Self::new().status(status)
    }

    /// Parse a JSON object (`{"status": 200, ...}`)
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::try_from(value)
    }

    pub fn status(self, status: u16) -> Self {
        self.field(STATUS_KEY, status)
    }

    pub fn status_text(self, text: impl Into<String>) -> Self {
        self.field(STATUS_TEXT_KEY, text.into())
    }

    pub fn response_text(self, text: impl Into<String>) -> Self {
        self.field(RESPONSE_TEXT_KEY, text.into())
    }

    pub fn response(self, body: impl Into<Value>) -> Self {
        self.field(RESPONSE_KEY, body)
    }

    /// Raw header block, e.g. `"Content-Type: application/json\r\n"`
    pub fn response_headers(self, headers: impl Into<String>) -> Self {
        self.field(RESPONSE_HEADERS_KEY, headers.into())
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ResponseData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ResponseData {
    type Error = FakeRequestError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(FakeRequestError::PayloadNotObject(json_kind(&other).to_string())),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
