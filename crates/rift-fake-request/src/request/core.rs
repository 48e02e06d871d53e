//! Fake request state and its shareable handle.
//!
//! `FakeRequest` is a cheap clone of one intercepted call. Every method takes
//! the state lock only for the duration of the field update; event handlers
//! and send notifications run after the lock is released, so handlers may
//! call back into the same request or into the registry.

use super::headers::{parse_response_headers, serialize_headers};
use super::hooks::RequestHooks;
use super::types::{
    Event, EventHandler, EventType, ReadyState, ResponseData, DEFAULT_RESPOND_STATUS,
    RESPONSE_HEADERS_KEY, RESPONSE_KEY, RESPONSE_TEXT_KEY, STATUS_KEY, STATUS_TEXT_KEY,
};
use crate::url::{parse_query_string, RequestUrl};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Terminal transitions a request can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Respond,
    Fail,
    Abort,
}

impl Terminal {
    fn event_type(self) -> EventType {
        match self {
            Terminal::Respond => EventType::Load,
            Terminal::Fail => EventType::Error,
            Terminal::Abort => EventType::Abort,
        }
    }
}

struct RequestState {
    index: usize,
    created_at: DateTime<Utc>,
    method: String,
    url: Option<String>,
    /// Recomputed on every URL assignment, never elsewhere
    uri: Option<RequestUrl>,
    is_async: bool,
    headers: HashMap<String, String>,
    data: Option<Value>,
    with_credentials: bool,
    response_type: String,
    mime_type: Option<String>,
    ready_state: ReadyState,
    sent: bool,
    /// Merged response record (status, responseText, extension keys, ...)
    fields: Map<String, Value>,
    responded: bool,
    aborted: bool,
    handlers: HashMap<EventType, EventHandler>,
}

impl RequestState {
    fn new(index: usize) -> Self {
        Self {
            index,
            created_at: Utc::now(),
            method: "GET".to_string(),
            url: None,
            uri: None,
            is_async: true,
            headers: HashMap::new(),
            data: None,
            with_credentials: false,
            response_type: String::new(),
            mime_type: None,
            ready_state: ReadyState::Unsent,
            sent: false,
            fields: Map::new(),
            responded: false,
            aborted: false,
            handlers: HashMap::new(),
        }
    }

    fn set_url(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.uri = Some(RequestUrl::parse(url));
    }

    /// Shallow merge: each key overwrites, nothing is deep-merged
    fn merge(&mut self, data: &ResponseData) {
        for (key, value) in data.iter() {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    fn status(&self) -> u16 {
        self.fields
            .get(STATUS_KEY)
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
            .unwrap_or(0)
    }

    fn string_field(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn response_headers(&self) -> String {
        self.string_field(RESPONSE_HEADERS_KEY).unwrap_or_default()
    }
}

/// Handle to one intercepted call.
///
/// Clones share state; equality is identity.
#[derive(Clone)]
pub struct FakeRequest {
    state: Arc<Mutex<RequestState>>,
    hooks: RequestHooks,
}

impl FakeRequest {
    pub(crate) fn new(index: usize, hooks: RequestHooks) -> Self {
        Self {
            state: Arc::new(Mutex::new(RequestState::new(index))),
            hooks,
        }
    }

    /// Creation index, assigned once by the constructor
    pub fn index(&self) -> usize {
        self.state.lock().index
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.state.lock().created_at
    }

    pub fn ptr_eq(&self, other: &FakeRequest) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    // ===== Request side =====

    /// `open(method, url)` with `async = true`
    pub fn open(&self, method: &str, url: &str) {
        self.open_with(method, url, true);
    }

    pub fn open_with(&self, method: &str, url: &str, is_async: bool) {
        let mut state = self.state.lock();
        state.method = method.to_string();
        state.set_url(url);
        state.is_async = is_async;
        state.ready_state = ReadyState::Opened;
    }

    /// Assign the URL without reopening
    pub fn set_url(&self, url: &str) {
        self.state.lock().set_url(url);
    }

    pub fn set_request_header(&self, name: &str, value: &str) {
        self.state
            .lock()
            .headers
            .insert(name.to_string(), value.to_string());
    }

    /// Store the payload and notify observers. Never waits for a response.
    pub fn send(&self, data: Option<Value>) {
        {
            let mut state = self.state.lock();
            if state.url.is_none() {
                warn!(index = state.index, "send() called before open()");
            }
            state.data = data;
            state.sent = true;
        }
        self.hooks.notify_send(self);
    }

    pub fn set_with_credentials(&self, with_credentials: bool) {
        self.state.lock().with_credentials = with_credentials;
    }

    pub fn set_response_type(&self, response_type: &str) {
        self.state.lock().response_type = response_type.to_string();
    }

    /// Recorded only; responses are never re-interpreted
    pub fn override_mime_type(&self, mime: &str) {
        self.state.lock().mime_type = Some(mime.to_string());
    }

    // ===== Events =====

    /// One handler per event type; a later registration replaces the earlier one
    pub fn add_event_listener<F>(&self, event_type: impl Into<EventType>, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.set_handler(event_type.into(), Arc::new(handler));
    }

    pub fn set_onload<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.set_handler(EventType::Load, Arc::new(handler));
    }

    pub fn set_onerror<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.set_handler(EventType::Error, Arc::new(handler));
    }

    pub fn set_onabort<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.set_handler(EventType::Abort, Arc::new(handler));
    }

    pub fn set_handler(&self, event_type: EventType, handler: EventHandler) {
        self.state.lock().handlers.insert(event_type, handler);
    }

    pub fn has_handler(&self, event_type: &EventType) -> bool {
        self.state.lock().handlers.contains_key(event_type)
    }

    // ===== Terminal transitions =====

    /// Merge `data`, default `status` to 200 when never set, fire `load`
    pub fn respond(&self, data: &ResponseData) {
        self.terminate(data, Terminal::Respond);
    }

    /// Merge `data` and fire `error`; no status default
    pub fn fail(&self, data: &ResponseData) {
        self.terminate(data, Terminal::Fail);
    }

    /// Merge `data`, mark aborted, fire `abort`
    pub fn abort(&self, data: &ResponseData) {
        self.terminate(data, Terminal::Abort);
    }

    fn terminate(&self, data: &ResponseData, terminal: Terminal) {
        let event_type = terminal.event_type();
        let handler = {
            let mut state = self.state.lock();
            state.merge(data);
            if terminal == Terminal::Respond && !state.fields.contains_key(STATUS_KEY) {
                state
                    .fields
                    .insert(STATUS_KEY.to_string(), Value::from(DEFAULT_RESPOND_STATUS));
            }
            if terminal == Terminal::Abort {
                state.aborted = true;
            }
            state.responded = true;
            state.ready_state = ReadyState::Done;
            trace!(
                index = state.index,
                event = %event_type,
                status = state.status(),
                "terminal transition"
            );
            state.handlers.get(&event_type).cloned()
        };

        if let Some(handler) = handler {
            let event = Event {
                event_type,
                target: self.clone(),
            };
            handler(&event);
        }
    }

    // ===== Response side =====

    pub fn status(&self) -> u16 {
        self.state.lock().status()
    }

    pub fn status_text(&self) -> Option<String> {
        self.state.lock().string_field(STATUS_TEXT_KEY)
    }

    /// `responseText`, falling back to a string `response`
    pub fn response_text(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .string_field(RESPONSE_TEXT_KEY)
            .or_else(|| state.string_field(RESPONSE_KEY))
    }

    pub fn response(&self) -> Option<Value> {
        self.state.lock().fields.get(RESPONSE_KEY).cloned()
    }

    pub fn get_all_response_headers(&self) -> String {
        self.state.lock().response_headers()
    }

    /// Case-insensitive lookup in the raw response header block
    pub fn get_response_header(&self, name: &str) -> Option<String> {
        let raw = self.state.lock().response_headers();
        parse_response_headers(&raw).remove(&name.to_lowercase())
    }

    /// Any merged response key, including extension fields
    pub fn field(&self, name: &str) -> Option<Value> {
        self.state.lock().fields.get(name).cloned()
    }

    pub fn fields(&self) -> Map<String, Value> {
        self.state.lock().fields.clone()
    }

    pub fn responded(&self) -> bool {
        self.state.lock().responded
    }

    pub fn aborted(&self) -> bool {
        self.state.lock().aborted
    }

    pub fn is_sent(&self) -> bool {
        self.state.lock().sent
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state.lock().ready_state
    }

    // ===== Request accessors =====

    pub fn method(&self) -> String {
        self.state.lock().method.clone()
    }

    pub fn is_async(&self) -> bool {
        self.state.lock().is_async
    }

    pub fn with_credentials(&self) -> bool {
        self.state.lock().with_credentials
    }

    pub fn response_type(&self) -> String {
        self.state.lock().response_type.clone()
    }

    pub fn mime_type(&self) -> Option<String> {
        self.state.lock().mime_type.clone()
    }

    pub fn headers(&self) -> HashMap<String, String> {
        self.state.lock().headers.clone()
    }

    pub fn request_header(&self, name: &str) -> Option<String> {
        self.state.lock().headers.get(name).cloned()
    }

    pub fn serialize_headers(&self) -> String {
        serialize_headers(&self.state.lock().headers)
    }

    /// Payload exactly as passed to `send`
    pub fn data(&self) -> Option<Value> {
        self.state.lock().data.clone()
    }

    /// Payload with string bodies decoded as form pairs into a JSON object
    pub fn body(&self) -> Option<Value> {
        match self.data()? {
            Value::String(encoded) => Some(Value::Object(
                parse_query_string(&encoded)
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
            )),
            other => Some(other),
        }
    }

    // ===== URL accessors (None before open) =====

    pub fn url(&self) -> Option<String> {
        self.state.lock().url.clone()
    }

    pub fn uri(&self) -> Option<RequestUrl> {
        self.state.lock().uri.clone()
    }

    pub fn host(&self) -> Option<String> {
        self.state.lock().uri.as_ref().map(RequestUrl::host)
    }

    pub fn domain(&self) -> Option<String> {
        self.state.lock().uri.as_ref().map(RequestUrl::domain)
    }

    pub fn query(&self) -> Option<HashMap<String, String>> {
        self.state.lock().uri.as_ref().map(RequestUrl::query)
    }

    pub fn query_string(&self) -> Option<String> {
        self.state
            .lock()
            .uri
            .as_ref()
            .map(|uri| uri.query_string().to_string())
    }
}

impl PartialEq for FakeRequest {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for FakeRequest {}

impl fmt::Debug for FakeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FakeRequest")
            .field("index", &state.index)
            .field("method", &state.method)
            .field("url", &state.url)
            .field("status", &state.status())
            .field("responded", &state.responded)
            .field("aborted", &state.aborted)
            .finish()
    }
}
