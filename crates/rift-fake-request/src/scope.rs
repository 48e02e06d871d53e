//! Installation slot for the active request constructor.
//!
//! Code under test asks a `GlobalScope` for new requests instead of naming a
//! concrete client type. `Registry::mock` swaps the fake constructor into the
//! slot and `Registry::restore` puts the previous occupant back.

use crate::request::{EventHandler, EventType, FakeRequest, ReadyState, ResponseData};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// XHR-shaped surface the code under test programs against
pub trait HttpRequest: Send + Sync {
    fn open(&self, method: &str, url: &str, is_async: bool);

    fn set_request_header(&self, name: &str, value: &str);

    fn send(&self, data: Option<Value>);

    fn abort(&self);

    fn add_event_listener(&self, event_type: EventType, handler: EventHandler);

    fn ready_state(&self) -> ReadyState;

    fn status(&self) -> u16;

    fn response_text(&self) -> Option<String>;

    fn get_response_header(&self, name: &str) -> Option<String>;

    fn get_all_response_headers(&self) -> String;
}

/// A request constructor that can occupy the installation slot
pub trait RequestFactory: Send + Sync {
    fn name(&self) -> &str;

    fn create(&self) -> Box<dyn HttpRequest>;
}

static GLOBAL_SCOPE: Lazy<Arc<GlobalScope>> = Lazy::new(|| Arc::new(GlobalScope::default()));

/// Process-scoped context holding the current request constructor
#[derive(Default)]
pub struct GlobalScope {
    slot: RwLock<Option<Arc<dyn RequestFactory>>>,
}

impl GlobalScope {
    /// An isolated scope, starting with `factory` installed
    pub fn new(factory: Option<Arc<dyn RequestFactory>>) -> Arc<Self> {
        Arc::new(Self {
            slot: RwLock::new(factory),
        })
    }

    /// The process-wide scope
    pub fn global() -> Arc<GlobalScope> {
        Arc::clone(&GLOBAL_SCOPE)
    }

    pub fn current(&self) -> Option<Arc<dyn RequestFactory>> {
        self.slot.read().clone()
    }

    pub fn current_name(&self) -> Option<String> {
        self.slot.read().as_ref().map(|f| f.name().to_string())
    }

    /// Replace the slot's occupant and return the previous one
    pub fn install(
        &self,
        factory: Option<Arc<dyn RequestFactory>>,
    ) -> Option<Arc<dyn RequestFactory>> {
        std::mem::replace(&mut *self.slot.write(), factory)
    }

    /// Ask the installed constructor for a new request
    pub fn create_request(&self) -> Option<Box<dyn HttpRequest>> {
        // Release the slot before constructing: creation notifies observers
        let factory = self.current()?;
        Some(factory.create())
    }
}

impl fmt::Debug for GlobalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalScope")
            .field("current", &self.current_name())
            .finish()
    }
}

impl HttpRequest for FakeRequest {
    fn open(&self, method: &str, url: &str, is_async: bool) {
        self.open_with(method, url, is_async);
    }

    fn set_request_header(&self, name: &str, value: &str) {
        FakeRequest::set_request_header(self, name, value);
    }

    fn send(&self, data: Option<Value>) {
        FakeRequest::send(self, data);
    }

    fn abort(&self) {
        FakeRequest::abort(self, &ResponseData::new());
    }

    fn add_event_listener(&self, event_type: EventType, handler: EventHandler) {
        self.set_handler(event_type, handler);
    }

    fn ready_state(&self) -> ReadyState {
        FakeRequest::ready_state(self)
    }

    fn status(&self) -> u16 {
        FakeRequest::status(self)
    }

    fn response_text(&self) -> Option<String> {
        FakeRequest::response_text(self)
    }

    fn get_response_header(&self, name: &str) -> Option<String> {
        FakeRequest::get_response_header(self, name)
    }

    fn get_all_response_headers(&self) -> String {
        FakeRequest::get_all_response_headers(self)
    }
}
