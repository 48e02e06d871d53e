//! Fake request objects and the constructor that creates them.
//!
//! ## Module Structure
//!
//! - `types`: events, ready state and the open response record
//! - `headers`: raw header block parsing
//! - `hooks`: the fake constructor and its create/send observers
//! - `core`: `FakeRequest` and its terminal-transition state machine

mod core;
mod headers;
mod hooks;
mod types;


pub use self::core::FakeRequest;
pub use headers::parse_response_headers;
pub use hooks::{RequestHooks, RequestObserver};
pub use types::{
    Event, EventHandler, EventType, ReadyState, ResponseData, DEFAULT_RESPOND_STATUS,
    RESPONSE_HEADERS_KEY, RESPONSE_KEY, RESPONSE_TEXT_KEY, STATUS_KEY, STATUS_TEXT_KEY,
};
