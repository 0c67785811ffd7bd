#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

//! Page shim -> mediator -> background, all in process.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use mockwire_bridge::api::ExtensionApi;
use mockwire_bridge::config::BridgeConfig;
use mockwire_bridge::contexts::Extension;
use mockwire_bridge::engine::MemoryStore;
use mockwire_bridge::shim::{EventKind, Fetch, RequestInit, XhrFactory, XhrHandle};
use mockwire_core::protocol::{DomainToggle, InterceptedRequest, PageInfo};

use fakes::{recorder, FakeXhrFactory, RecordingFetch};

const RULES: &str = r#"
projects:
  - id: demo
    domainPattern: "https://*.example.com"
    apis:
      - id: user
        path: /api/user/:id
        method: GET
        statusCode: 200
        responseBody: '{"ok":true}'
      - id: create
        path: /api/*
        method: POST
        statusCode: 201
        responseBody: '{"created":true}'
      - id: slow
        path: /slow
        method: GET
        delay: 31000
        responseBody: '{"slow":true}'
"#;

const PAGE: &str = "https://sub.example.com/app";

fn extension() -> Extension {
    let store = MemoryStore::from_yaml_str(RULES).unwrap();
    Extension::launch(&BridgeConfig::default(), Arc::new(store))
}

#[tokio::test]
async fn fetch_is_mocked_across_both_hops() {
    let ext = extension();
    let network = Arc::new(RecordingFetch::default());
    let opened = ext
        .open_page(PAGE, Arc::clone(&network), FakeXhrFactory::default())
        .await
        .expect("page is eligible");

    let res = opened.shim.fetch.fetch("/api/user/42".into(), None).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.json::<serde_json::Value>().unwrap(), json!({ "ok": true }));
    assert_eq!(network.count(), 0);

    let m = ext.metrics();
    assert_eq!(m.calls.get(&[("hop", "page"), ("method", "handleRequest"), ("outcome", "ok")]), 1);
    assert_eq!(m.calls.get(&[("hop", "mediator"), ("method", "handleRequest"), ("outcome", "ok")]), 1);
}

#[tokio::test]
async fn unmatched_requests_reach_the_network() {
    let ext = extension();
    let network = Arc::new(RecordingFetch::default());
    let opened = ext
        .open_page(PAGE, Arc::clone(&network), FakeXhrFactory::default())
        .await
        .unwrap();
    let fetch = &opened.shim.fetch;

    let res = fetch.fetch("/api/user/42/extra".into(), None).await.unwrap();
    assert_eq!(res.text(), "from network");

    fetch.fetch("/api/anything".into(), None).await.unwrap();
    assert_eq!(network.count(), 2);

    let post = RequestInit { method: Some("POST".into()), ..Default::default() };
    let res = fetch.fetch("/api/anything".into(), Some(post)).await.unwrap();
    assert_eq!(res.status, 201);
    assert_eq!(network.count(), 2);
}

#[tokio::test]
async fn xhr_is_mocked_across_both_hops() {
    let ext = extension();
    let factory = FakeXhrFactory::default();
    let opened = ext
        .open_page(PAGE, RecordingFetch::default(), factory.clone())
        .await
        .unwrap();

    let xhr = opened.shim.xhr.create();
    let (listener, mut events) = recorder();
    xhr.add_event_listener(EventKind::LoadEnd, listener);
    xhr.open("GET", "https://sub.example.com/api/user/9");
    xhr.send(None);

    assert_eq!(events.recv().await, Some(EventKind::LoadEnd));
    assert_eq!(xhr.status(), 200);
    assert_eq!(xhr.response_text(), r#"{"ok":true}"#);
    assert!(!factory.made.lock().unwrap()[0].sent());
}

#[tokio::test]
async fn ineligible_pages_keep_their_primitives() {
    let ext = extension();
    let other = ext
        .open_page("https://other.org/", RecordingFetch::default(), FakeXhrFactory::default())
        .await;
    assert!(other.is_none());

    let http = ext
        .open_page("http://sub.example.com/", RecordingFetch::default(), FakeXhrFactory::default())
        .await;
    assert!(http.is_none());
}

#[tokio::test]
async fn disabling_a_domain_stops_injection_and_mocking() {
    let ext = extension();
    let network = Arc::new(RecordingFetch::default());
    let opened = ext
        .open_page(PAGE, Arc::clone(&network), FakeXhrFactory::default())
        .await
        .unwrap();

    // Toggle through the privileged side, as a popup would.
    let toggle = DomainToggle { domain: "sub.example.com".into(), enabled: false };
    assert!(opened.mediator.client().set_domain_enabled(toggle).await.unwrap());

    opened.shim.fetch.fetch("/api/user/1".into(), None).await.unwrap();
    assert_eq!(network.count(), 1);

    let again = ext
        .open_page(PAGE, RecordingFetch::default(), FakeXhrFactory::default())
        .await;
    assert!(again.is_none());
}

#[tokio::test]
async fn page_cannot_call_privileged_methods() {
    let ext = extension();
    let opened = ext
        .open_page(PAGE, RecordingFetch::default(), FakeXhrFactory::default())
        .await
        .unwrap();
    let page = opened.page.client();

    let err = page
        .should_intercept(PageInfo { page_url: PAGE.into() })
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "METHOD_NOT_FOUND");
    assert_eq!(err.to_string(), "not method shouldIntercept found");

    let err = page
        .set_domain_enabled(DomainToggle { domain: "sub.example.com".into(), enabled: false })
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "METHOD_NOT_FOUND");

    // handleRequest still works on the same link.
    let outcome = page
        .handle_request(InterceptedRequest::new("/api/user/3", "GET"))
        .await
        .unwrap();
    assert!(outcome.is_mock());
}

#[tokio::test(start_paused = true)]
async fn rule_delay_longer_than_call_timeout_still_mocks() {
    let ext = extension();
    let network = Arc::new(RecordingFetch::default());
    let opened = ext
        .open_page(PAGE, Arc::clone(&network), FakeXhrFactory::default())
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    let res = opened.shim.fetch.fetch("/slow".into(), None).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(31_000));
    assert_eq!(res.json::<serde_json::Value>().unwrap(), json!({ "slow": true }));
    assert_eq!(network.count(), 0);

    let m = ext.metrics();
    assert_eq!(m.calls.get(&[("hop", "page"), ("method", "handleRequest"), ("outcome", "timeout")]), 0);
}

#[tokio::test]
async fn concurrent_burst_beyond_channel_capacity_is_fully_mocked() {
    let ext = extension();
    let network = Arc::new(RecordingFetch::default());
    let opened = ext
        .open_page(PAGE, Arc::clone(&network), FakeXhrFactory::default())
        .await
        .unwrap();
    let fetch = &opened.shim.fetch;

    let burst = BridgeConfig::default().bridge.channel_capacity + 44;
    let results = futures_util::future::join_all(
        (0..burst).map(|i| fetch.fetch(format!("/api/user/{i}").into(), None)),
    )
    .await;

    for res in results {
        assert_eq!(res.unwrap().json::<serde_json::Value>().unwrap(), json!({ "ok": true }));
    }
    assert_eq!(network.count(), 0);
    let m = ext.metrics();
    assert_eq!(m.decisions.get(&[("decision", "mock")]), burst as u64);
}
