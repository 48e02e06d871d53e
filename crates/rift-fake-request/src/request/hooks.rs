//! The fake request constructor and its create/send observers.

use super::core::FakeRequest;
use crate::scope::{HttpRequest, RequestFactory};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Receives creation and send notifications from `RequestHooks`.
///
/// Observers are called synchronously, in subscription order, with no lock
/// held, so they may call back into the request.
pub trait RequestObserver: Send + Sync {
    fn on_create(&self, request: &FakeRequest);

    fn on_send(&self, request: &FakeRequest);
}

#[derive(Default)]
struct HooksInner {
    next_index: AtomicUsize,
    observers: RwLock<Vec<Weak<dyn RequestObserver>>>,
}

/// Creates fake requests, numbers them, and fans out notifications.
///
/// Observers are held weakly: a dropped registry silently unsubscribes.
#[derive(Clone, Default)]
pub struct RequestHooks {
    inner: Arc<HooksInner>,
}

impl RequestHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request with the next creation index and announce it
    pub fn new_request(&self) -> FakeRequest {
        let index = self.inner.next_index.fetch_add(1, Ordering::SeqCst);
        let request = FakeRequest::new(index, self.clone());
        trace!(index, "fake request created");

        for observer in self.live_observers() {
            observer.on_create(&request);
        }
        request
    }

    pub fn subscribe(&self, observer: Weak<dyn RequestObserver>) {
        let mut observers = self.inner.observers.write();
        if !observers.iter().any(|existing| existing.ptr_eq(&observer)) {
            observers.push(observer);
        }
    }

    pub fn unsubscribe(&self, observer: &Weak<dyn RequestObserver>) {
        self.inner
            .observers
            .write()
            .retain(|existing| !existing.ptr_eq(observer));
    }

    pub fn observer_count(&self) -> usize {
        self.live_observers().len()
    }

    /// Next request created gets index 0 again
    pub(crate) fn restart_sequence(&self) {
        self.inner.next_index.store(0, Ordering::SeqCst);
    }

    pub(crate) fn notify_send(&self, request: &FakeRequest) {
        for observer in self.live_observers() {
            observer.on_send(request);
        }
    }

    fn live_observers(&self) -> Vec<Arc<dyn RequestObserver>> {
        self.inner
            .observers
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl RequestFactory for RequestHooks {
    fn name(&self) -> &str {
        "fake"
    }

    fn create(&self) -> Box<dyn HttpRequest> {
        Box::new(self.new_request())
    }
}

impl fmt::Debug for RequestHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHooks")
            .field("next_index", &self.inner.next_index.load(Ordering::SeqCst))
            .field("observers", &self.inner.observers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
    }

    impl RequestObserver for Recorder {
        fn on_create(&self, request: &FakeRequest) {
            self.log.lock().push(format!("create:{}", request.index()));
        }

        fn on_send(&self, request: &FakeRequest) {
            self.log.lock().push(format!("send:{}", request.index()));
        }
    }

    #[test]
    fn test_observers_called_in_subscription_order() {
        let hooks = RequestHooks::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let first_weak = Arc::downgrade(&first) as Weak<dyn RequestObserver>;
        let second_weak = Arc::downgrade(&second) as Weak<dyn RequestObserver>;
        hooks.subscribe(first_weak);
        hooks.subscribe(second_weak);

        let request = hooks.new_request();
        request.open("GET", "http://api.test/");
        request.send(None);

        assert_eq!(*first.log.lock(), vec!["create:0", "send:0"]);
        assert_eq!(*second.log.lock(), vec!["create:0", "send:0"]);
    }

    #[test]
    fn test_subscribe_is_idempotent_and_unsubscribe_removes() {
        let hooks = RequestHooks::new();
        let recorder = Arc::new(Recorder::default());
        let weak = Arc::downgrade(&recorder) as Weak<dyn RequestObserver>;

        hooks.subscribe(weak.clone());
        hooks.subscribe(weak.clone());
        assert_eq!(hooks.observer_count(), 1);

        hooks.unsubscribe(&weak);
        assert_eq!(hooks.observer_count(), 0);
        hooks.new_request();
        assert!(recorder.log.lock().is_empty());
    }

    #[test]
    fn test_dropped_observer_is_skipped() {
        let hooks = RequestHooks::new();
        let recorder = Arc::new(Recorder::default());
        hooks.subscribe(Arc::downgrade(&recorder) as Weak<dyn RequestObserver>);
        drop(recorder);

        assert_eq!(hooks.observer_count(), 0);
        let request = hooks.new_request();
        assert_eq!(request.index(), 0);
    }

    #[test]
    fn test_indices_increase_until_restart() {
        let hooks = RequestHooks::new();
        assert_eq!(hooks.new_request().index(), 0);
        assert_eq!(hooks.new_request().index(), 1);
        hooks.restart_sequence();
        assert_eq!(hooks.new_request().index(), 0);
    }
}
