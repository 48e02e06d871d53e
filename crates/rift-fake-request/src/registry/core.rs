//! The fake backend: request list, queued rules, broadcast response.

use crate::config::FixtureConfig;
use crate::error::Result;
use crate::matcher::Selector;
use crate::request::{FakeRequest, RequestHooks, RequestObserver, ResponseData};
use crate::scope::{GlobalScope, RequestFactory};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace};

/// A queued response, re-evaluated on every dispatch pass until reset.
///
/// Rules are kept in arrival order and the first match wins.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub selector: Selector,
    pub response: ResponseData,
}

#[derive(Default)]
struct RegistryState {
    requests: Vec<FakeRequest>,
    rules: Vec<Arc<MatchRule>>,
    broadcast: Option<Arc<ResponseData>>,
}

#[derive(Default)]
struct Activation {
    active: bool,
    /// Slot occupant displaced by `mock`, handed back by `restore`
    cached: Option<Arc<dyn RequestFactory>>,
}

struct RegistryInner {
    hooks: RequestHooks,
    scope: Arc<GlobalScope>,
    state: Mutex<RegistryState>,
    activation: Mutex<Activation>,
}

impl RegistryInner {
    /// Apply queued rules, then the broadcast, to every unresponded request.
    ///
    /// Works on a snapshot; no registry lock is held while responses (and
    /// therefore event handlers) run.
    fn dispatch(&self) {
        let (requests, rules, broadcast) = {
            let state = self.state.lock();
            (
                state.requests.clone(),
                state.rules.clone(),
                state.broadcast.clone(),
            )
        };

        let mut applied = 0usize;
        for request in &requests {
            if request.responded() {
                continue;
            }

            if let Some(rule) = rules.iter().find(|rule| rule.selector.matches(request)) {
                trace!(index = request.index(), rule = %rule.selector, "rule matched");
                request.respond(&rule.response);
                applied += 1;
            }

            if !request.responded() {
                if let Some(ref broadcast) = broadcast {
                    trace!(index = request.index(), "broadcast applied");
                    request.respond(broadcast);
                    applied += 1;
                }
            }
        }

        debug!(
            requests = requests.len(),
            rules = rules.len(),
            broadcast = broadcast.is_some(),
            applied,
            "dispatch pass complete"
        );
    }
}

impl RequestObserver for RegistryInner {
    fn on_create(&self, request: &FakeRequest) {
        self.state.lock().requests.push(request.clone());
    }

    fn on_send(&self, _request: &FakeRequest) {
        self.dispatch();
    }
}

/// In-memory fake backend for intercepted requests.
///
/// Clones share one backend. `mock` installs it into its `GlobalScope`,
/// `restore` uninstalls it.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry bound to the process-wide scope
    pub fn new() -> Self {
        Self::with_scope(GlobalScope::global())
    }

    /// A registry bound to an isolated scope
    pub fn with_scope(scope: Arc<GlobalScope>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                hooks: RequestHooks::new(),
                scope,
                state: Mutex::new(RegistryState::default()),
                activation: Mutex::new(Activation::default()),
            }),
        }
    }

    /// The fake constructor; requests it creates register here while mocked
    pub fn factory(&self) -> RequestHooks {
        self.inner.hooks.clone()
    }

    pub fn scope(&self) -> Arc<GlobalScope> {
        Arc::clone(&self.inner.scope)
    }

    fn observer(&self) -> Weak<dyn RequestObserver> {
        Arc::downgrade(&self.inner) as Weak<dyn RequestObserver>
    }

    // ===== Installation =====

    /// Start intercepting. Only the first call has any effect.
    pub fn mock(&self) {
        let mut activation = self.inner.activation.lock();
        if activation.active {
            return;
        }

        let fake: Arc<dyn RequestFactory> = Arc::new(self.inner.hooks.clone());
        activation.cached = self.inner.scope.install(Some(fake));
        activation.active = true;
        // Requests created while nobody was recording must not shift indices
        self.inner.hooks.restart_sequence();
        self.inner.hooks.subscribe(self.observer());

        info!(
            replaced = activation
                .cached
                .as_ref()
                .map(|factory| factory.name())
                .unwrap_or("<none>"),
            "fake request backend installed"
        );
    }

    /// Reset, then hand the slot back to whatever `mock` displaced
    pub fn restore(&self) {
        self.reset();

        let mut activation = self.inner.activation.lock();
        if !activation.active {
            return;
        }

        let original = activation.cached.take();
        self.inner.scope.install(original);
        activation.active = false;
        self.inner.hooks.unsubscribe(&self.observer());

        info!("fake request backend restored");
    }

    pub fn is_active(&self) -> bool {
        self.inner.activation.lock().active
    }

    /// Drop all requests, rules and the broadcast. Activation is untouched.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        let dropped = state.requests.len();
        *state = RegistryState::default();
        self.inner.hooks.restart_sequence();

        debug!(dropped, "fake request registry reset");
    }

    // ===== Scripting responses =====

    /// Respond to every unresponded request, now and until the next reset
    pub fn respond(&self, data: ResponseData) {
        self.inner.state.lock().broadcast = Some(Arc::new(data));
        self.inner.dispatch();
    }

    /// Index selectors respond once to that request only; every other
    /// selector is queued and applies to past and future matches
    pub fn respond_to(&self, selector: impl Into<Selector>, data: ResponseData) {
        match selector.into() {
            Selector::Index(index) => {
                if let Some(request) = self.get(index) {
                    request.respond(&data);
                }
            }
            selector => {
                let mut state = self.inner.state.lock();
                debug!(rule = %selector, queued = state.rules.len() + 1, "response rule queued");
                state.rules.push(Arc::new(MatchRule {
                    selector,
                    response: data,
                }));
            }
        }
        self.inner.dispatch();
    }

    /// Respond to the most recently created request, if any
    pub fn respond_to_last(&self, data: ResponseData) {
        if let Some(request) = self.last_request() {
            request.respond(&data);
        }
        self.inner.dispatch();
    }

    /// Queue every fixture rule in order, then set the default response
    pub fn load_fixtures(&self, fixtures: &FixtureConfig) -> Result<()> {
        fixtures.validate()?;

        for rule in &fixtures.rules {
            self.respond_to(rule.selector()?, rule.response.clone());
        }
        if let Some(ref default_response) = fixtures.default_response {
            self.respond(default_response.clone());
        }

        debug!(
            rules = fixtures.rules.len(),
            default_response = fixtures.default_response.is_some(),
            "fixtures loaded"
        );
        Ok(())
    }

    // ===== Lookup =====

    pub fn get(&self, index: usize) -> Option<FakeRequest> {
        self.inner.state.lock().requests.get(index).cloned()
    }

    /// Requests satisfying `selector`, in creation order
    pub fn get_matching(&self, selector: impl Into<Selector>) -> Vec<FakeRequest> {
        let selector = selector.into();
        self.requests()
            .into_iter()
            .filter(|request| selector.matches(request))
            .collect()
    }

    pub fn last_request(&self) -> Option<FakeRequest> {
        self.inner.state.lock().requests.last().cloned()
    }

    pub fn requests(&self) -> Vec<FakeRequest> {
        self.inner.state.lock().requests.clone()
    }

    pub fn rules(&self) -> Vec<MatchRule> {
        self.inner
            .state
            .lock()
            .rules
            .iter()
            .map(|rule| MatchRule::clone(rule))
            .collect()
    }

    pub fn broadcast(&self) -> Option<ResponseData> {
        self.inner
            .state
            .lock()
            .broadcast
            .as_deref()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().requests.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Registry")
            .field("active", &self.inner.activation.lock().active)
            .field("requests", &state.requests.len())
            .field("rules", &state.rules.len())
            .field("broadcast", &state.broadcast.is_some())
            .finish()
    }
}
