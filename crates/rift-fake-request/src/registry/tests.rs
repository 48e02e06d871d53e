//! Tests for the registry module.
//!
//! Covers:
//! - mock/restore/reset life cycle against an isolated scope
//! - broadcast, index, URL and regex responses (before and after send)
//! - dispatch ordering and lookup helpers

use super::*;
use crate::matcher::Selector;
use crate::request::{Event, EventType, FakeRequest, ResponseData};
use crate::scope::{GlobalScope, HttpRequest, RequestFactory};
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;
use tracing_test::traced_test;

const URLS: [&str; 5] = [
    "http://mydomain.com/path/?a=1&b=2",
    "http://mydomain.com/path/?a=1",
    "http://mydomain.com/",
    "http://other-domain.com/",
    "http://other-domain.com/?a=1",
];

/// Stand-in for the real constructor occupying the slot before `mock`
struct NativeFactory;

impl RequestFactory for NativeFactory {
    fn name(&self) -> &str {
        "native"
    }

    fn create(&self) -> Box<dyn HttpRequest> {
        unreachable!("native requests are never created in these tests")
    }
}

fn mocked_registry() -> Registry {
    let registry = Registry::with_scope(GlobalScope::new(None));
    registry.mock();
    registry
}

/// What the code under test does: ask the scope for a request, open, send
fn send_request(registry: &Registry, url: &str) {
    let xhr = registry
        .scope()
        .create_request()
        .expect("fake constructor installed");
    xhr.open("GET", url, true);
    xhr.send(None);
}

fn send_all(registry: &Registry) {
    for url in URLS {
        send_request(registry, url);
    }
}

fn statuses(registry: &Registry) -> Vec<u16> {
    registry.requests().iter().map(FakeRequest::status).collect()
}

// ===== mock / restore =====

#[test]
fn test_mock_installs_fake_and_caches_original() {
    let scope = GlobalScope::new(Some(Arc::new(NativeFactory)));
    let registry = Registry::with_scope(Arc::clone(&scope));

    registry.mock();
    assert!(registry.is_active());
    assert_eq!(scope.current_name().as_deref(), Some("fake"));

    // Second mock must not cache the fake over the original
    registry.mock();
    registry.restore();
    assert!(!registry.is_active());
    assert_eq!(scope.current_name().as_deref(), Some("native"));
}

#[test]
fn test_restore_without_mock_leaves_slot_alone() {
    let scope = GlobalScope::new(Some(Arc::new(NativeFactory)));
    let registry = Registry::with_scope(Arc::clone(&scope));

    registry.restore();
    registry.restore();
    assert_eq!(scope.current_name().as_deref(), Some("native"));
}

#[test]
fn test_restore_stops_recording() {
    let scope = GlobalScope::new(None);
    let registry = Registry::with_scope(Arc::clone(&scope));
    registry.mock();
    send_request(&registry, URLS[0]);
    assert_eq!(registry.len(), 1);

    registry.restore();
    assert!(registry.is_empty());
    assert!(scope.current().is_none());

    // The fake constructor still works, but nobody is listening
    registry.factory().new_request();
    assert!(registry.is_empty());
}

#[test]
fn test_requests_before_mock_are_not_recorded() {
    let registry = Registry::with_scope(GlobalScope::new(None));
    registry.factory().new_request();
    assert!(registry.is_empty());

    registry.mock();
    registry.factory().new_request();
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_indices_restart_when_recording_starts() {
    let registry = Registry::with_scope(GlobalScope::new(None));
    registry.factory().new_request();
    registry.factory().new_request();

    registry.mock();
    send_request(&registry, URLS[0]);
    assert_eq!(registry.get(0).map(|r| r.index()), Some(0));
    assert_eq!(registry.get_matching(0usize).len(), 1);

    // Unrecorded requests between restore and the next mock do not count either
    registry.restore();
    registry.factory().new_request();
    registry.mock();
    send_request(&registry, URLS[1]);
    assert_eq!(registry.get(0).map(|r| r.index()), Some(0));

    registry.respond_to(0usize, ResponseData::with_status(201));
    assert_eq!(
        registry.get_matching(0usize).first().map(FakeRequest::status),
        Some(201)
    );
}

// ===== reset =====

#[test]
fn test_reset_clears_requests_rules_and_broadcast() {
    let registry = mocked_registry();
    send_all(&registry);
    registry.respond_to("http://nowhere.test/", ResponseData::with_status(418));
    registry.respond(ResponseData::with_status(200));
    assert_eq!(registry.len(), 5);
    assert_eq!(registry.rules().len(), 1);

    registry.reset();
    assert!(registry.is_empty());
    assert!(registry.rules().is_empty());
    assert!(registry.broadcast().is_none());
    assert!(registry.last_request().is_none());
    assert!(registry.is_active());

    send_all(&registry);
    assert_eq!(statuses(&registry), vec![0, 0, 0, 0, 0]);
    assert_eq!(registry.get(0).map(|r| r.index()), Some(0));
}

// ===== respond (broadcast) =====

#[test]
fn test_respond_applies_to_existing_requests() {
    let registry = mocked_registry();
    send_all(&registry);
    assert_eq!(statuses(&registry), vec![0, 0, 0, 0, 0]);

    registry.respond(ResponseData::with_status(200));
    assert_eq!(statuses(&registry), vec![200; 5]);
}

#[test]
fn test_respond_applies_to_future_requests() {
    let registry = mocked_registry();
    registry.respond(ResponseData::with_status(200));
    assert!(registry.is_empty());

    send_all(&registry);
    assert_eq!(statuses(&registry), vec![200; 5]);
}

#[test]
fn test_broadcast_last_write_wins_for_unresponded_only() {
    let registry = mocked_registry();
    send_request(&registry, URLS[0]);
    registry.respond(ResponseData::with_status(200));

    registry.respond(ResponseData::with_status(503));
    send_request(&registry, URLS[1]);

    assert_eq!(statuses(&registry), vec![200, 503]);
    assert_eq!(registry.broadcast(), Some(ResponseData::with_status(503)));
}

// ===== respond_to =====

#[test]
fn test_respond_to_index_affects_only_that_request() {
    let registry = mocked_registry();
    send_all(&registry);

    registry.respond_to(4usize, ResponseData::with_status(200));
    registry.respond_to(3usize, ResponseData::with_status(401));
    registry.respond_to(2usize, ResponseData::with_status(400));

    assert_eq!(statuses(&registry), vec![0, 0, 400, 401, 200]);
    assert!(registry.rules().is_empty());
}

#[test]
fn test_respond_to_missing_index_is_noop() {
    let registry = mocked_registry();
    registry.respond_to(10usize, ResponseData::with_status(200));
    send_request(&registry, URLS[0]);
    assert_eq!(statuses(&registry), vec![0]);
}

#[test]
fn test_respond_to_url_resolves_query_keys() {
    let registry = mocked_registry();
    send_all(&registry);

    registry.respond_to("http://mydomain.com/path/?a=1", ResponseData::with_status(200));
    assert_eq!(statuses(&registry), vec![200, 200, 0, 0, 0]);
}

#[test]
fn test_respond_to_host_root() {
    let registry = mocked_registry();
    send_all(&registry);

    registry.respond_to("http://mydomain.com/", ResponseData::with_status(200));
    assert_eq!(statuses(&registry), vec![200, 200, 200, 0, 0]);
}

#[test]
fn test_respond_to_regex() {
    let registry = mocked_registry();
    send_all(&registry);

    registry.respond_to(Regex::new(r"other-domain").unwrap(), ResponseData::with_status(200));
    assert_eq!(statuses(&registry), vec![0, 0, 0, 200, 200]);
}

#[test]
fn test_rules_queued_before_send_apply_retroactively() {
    let registry = mocked_registry();
    registry.respond_to("http://mydomain.com/path/?a=1", ResponseData::with_status(200));
    registry.respond_to(Selector::regex("other").unwrap(), ResponseData::with_status(404));

    send_all(&registry);
    assert_eq!(statuses(&registry), vec![200, 200, 0, 404, 404]);
}

#[test]
fn test_first_queued_rule_wins() {
    let registry = mocked_registry();
    registry.respond_to("http://mydomain.com/", ResponseData::with_status(201));
    registry.respond_to("http://mydomain.com/path/", ResponseData::with_status(202));

    send_all(&registry);
    assert_eq!(statuses(&registry), vec![201, 201, 201, 0, 0]);
    let queued: Vec<String> = registry
        .rules()
        .iter()
        .map(|rule| rule.selector.to_string())
        .collect();
    assert_eq!(queued, vec!["http://mydomain.com/", "http://mydomain.com/path/"]);
}

#[test]
fn test_rule_takes_precedence_over_broadcast() {
    let registry = mocked_registry();
    registry.respond(ResponseData::with_status(500));
    registry.respond_to(Selector::regex("mydomain").unwrap(), ResponseData::with_status(200));

    send_all(&registry);
    assert_eq!(statuses(&registry), vec![200, 200, 200, 500, 500]);
}

#[test]
fn test_dispatch_does_not_reapply_to_responded_requests() {
    let registry = mocked_registry();
    let loads = Arc::new(Mutex::new(0));

    let xhr = registry.factory().new_request();
    let counter = Arc::clone(&loads);
    xhr.add_event_listener(EventType::Load, move |_: &Event| *counter.lock() += 1);
    xhr.open("GET", URLS[0]);
    xhr.send(None);

    registry.respond_to(Selector::regex("mydomain").unwrap(), ResponseData::with_status(200));
    registry.respond(ResponseData::with_status(500));
    send_request(&registry, URLS[3]);
    registry.respond_to_last(ResponseData::with_status(204));

    assert_eq!(*loads.lock(), 1);
    assert_eq!(xhr.status(), 200);
    // Explicit direct call re-applies
    assert_eq!(registry.last_request().map(|r| r.status()), Some(204));
}

#[test]
fn test_rule_persists_after_matching() {
    let registry = mocked_registry();
    registry.respond_to(Selector::regex("other").unwrap(), ResponseData::with_status(404));
    send_request(&registry, URLS[3]);
    send_request(&registry, URLS[0]);
    send_request(&registry, URLS[4]);

    assert_eq!(statuses(&registry), vec![404, 0, 404]);
    assert_eq!(registry.rules().len(), 1);
}

// ===== respond_to_last =====

#[test]
fn test_respond_to_last_request() {
    let registry = mocked_registry();
    send_request(&registry, URLS[0]);
    send_request(&registry, URLS[1]);

    registry.respond_to_last(ResponseData::with_status(200));
    assert_eq!(statuses(&registry), vec![0, 200]);
}

#[test]
fn test_respond_to_last_on_empty_registry() {
    let registry = mocked_registry();
    registry.respond_to_last(ResponseData::with_status(200));
    assert!(registry.is_empty());
}

// ===== lookup =====

#[test]
fn test_get_by_index() {
    let registry = mocked_registry();
    send_all(&registry);

    let requests = registry.requests();
    assert_eq!(registry.get(0).as_ref(), Some(&requests[0]));
    assert_eq!(registry.get(4).as_ref(), Some(&requests[4]));
    assert!(registry.get(10).is_none());
    assert_eq!(registry.last_request().as_ref(), Some(&requests[4]));
}

#[test]
fn test_get_matching_by_regex() {
    let registry = mocked_registry();
    send_all(&registry);
    let requests = registry.requests();

    assert_eq!(
        registry.get_matching(Regex::new("mydomain").unwrap()),
        requests[0..3].to_vec()
    );
    assert_eq!(
        registry.get_matching(Regex::new("mydomain.*b=2").unwrap()),
        vec![requests[0].clone()]
    );
}

#[test]
fn test_get_matching_by_url() {
    let registry = mocked_registry();
    send_all(&registry);
    let requests = registry.requests();

    assert_eq!(
        registry.get_matching("http://mydomain.com/path/?a=1"),
        vec![requests[0].clone(), requests[1].clone()]
    );
    assert_eq!(
        registry.get_matching("http://other-domain.com/"),
        vec![requests[3].clone(), requests[4].clone()]
    );
    assert!(registry.get_matching("http://absent.test/").is_empty());
}

#[test]
fn test_get_matching_by_index() {
    let registry = mocked_registry();
    send_all(&registry);
    assert_eq!(registry.get_matching(2usize).len(), 1);
    assert!(registry.get_matching(9usize).is_empty());
}

// ===== re-entrancy =====

#[test]
fn test_handler_may_call_back_into_registry() {
    let registry = mocked_registry();
    let inner = registry.clone();

    let first = registry.factory().new_request();
    first.set_onload(move |_| {
        inner.respond_to(1usize, ResponseData::with_status(299));
    });
    first.open("GET", URLS[0]);
    first.send(None);
    send_request(&registry, URLS[1]);

    registry.respond_to(0usize, ResponseData::with_status(200));
    assert_eq!(first.status(), 200);
    assert_eq!(registry.get(1).map(|r| r.status()), Some(299));
}

#[test]
fn test_unopened_request_gets_broadcast_but_not_url_rules() {
    let registry = mocked_registry();
    registry.respond_to("http://mydomain.com/", ResponseData::with_status(201));
    let unopened = registry.factory().new_request();

    registry.respond(ResponseData::with_status(202));
    assert_eq!(unopened.status(), 202);
}

// ===== logging =====

#[test]
#[traced_test]
fn test_lifecycle_and_dispatch_are_logged() {
    let registry = mocked_registry();
    send_request(&registry, URLS[0]);
    registry.respond_to(Selector::regex("mydomain").unwrap(), ResponseData::with_status(200));
    registry.restore();

    assert!(logs_contain("fake request backend installed"));
    assert!(logs_contain("response rule queued"));
    assert!(logs_contain("dispatch pass complete"));
    assert!(logs_contain("fake request backend restored"));
}
