//! In-memory fake for XMLHttpRequest-style clients.
//!
//! A [`Registry`] installs a fake request constructor into a [`GlobalScope`],
//! records every request created through it, and answers them from scripted
//! responses: a broadcast for everything, or rules keyed by creation index,
//! URL structure or regex.
//!
//! ```
//! use rift_fake_request::{GlobalScope, HttpRequest, Registry, ResponseData};
//!
//! let registry = Registry::with_scope(GlobalScope::new(None));
//! registry.mock();
//! registry.respond_to("http://api.test/users", ResponseData::with_status(404));
//!
//! let xhr = registry.scope().create_request().unwrap();
//! xhr.open("GET", "http://api.test/users?id=1", true);
//! xhr.send(None);
//! assert_eq!(xhr.status(), 404);
//!
//! registry.restore();
//! ```

// ===== Request side =====
pub mod request;
pub mod scope;
pub mod url;

// ===== Backend =====
pub mod matcher;
pub mod registry;

// ===== Ambient =====
pub mod config;
pub mod error;
pub mod logging;

pub use config::{FixtureConfig, FixtureRule};
pub use error::FakeRequestError;
pub use logging::init_tracing;
pub use matcher::{url_matches, Selector};
pub use registry::{MatchRule, Registry};
pub use request::{
    Event, EventHandler, EventType, FakeRequest, ReadyState, RequestHooks, RequestObserver,
    ResponseData,
};
pub use scope::{GlobalScope, HttpRequest, RequestFactory};
pub use url::RequestUrl;
