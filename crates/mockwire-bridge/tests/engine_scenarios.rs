#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use mockwire_bridge::engine::{MemoryStore, MockEngine};
use mockwire_bridge::obs::BridgeMetrics;
use mockwire_bridge::rpc::{CallCtx, Service};
use mockwire_core::protocol::{BridgeCall, DomainToggle, InterceptedRequest, PageInfo};
use mockwire_core::rules::MockOutcome;

const RULES: &str = r#"
projects:
  - id: shop
    domainPattern: "https://*.example.com"
    apis:
      - id: user
        path: /api/user/:id
        method: GET
        statusCode: 200
        responseBody: '{"ok":true}'
      - id: user-shadowed
        path: /api/user/:id
        method: GET
        statusCode: 500
        responseBody: '{"ok":false}'
      - id: create
        path: /api/*
        method: POST
        statusCode: 201
        responseBody: '{"created":true}'
      - id: broken
        path: /broken
        method: GET
        responseBody: '{not json'
      - id: slow
        path: /slow
        method: GET
        delay: 1500
        responseBody: '[]'
      - id: scripted
        path: /echo/:name
        method: GET
        responseBodyType: javascript
        code: '#{ path: request.path, q: request.query.q }'
      - id: off
        path: /off
        method: GET
        enabled: false
        responseBody: '{}'
  - id: disabled-project
    domainPattern: "*.example.com"
    enabled: false
    apis:
      - id: never
        path: /never
        method: GET
        responseBody: '{}'
"#;

const PAGE: &str = "https://sub.example.com/app/index.html";

fn engine() -> (MockEngine, Arc<BridgeMetrics>) {
    let store = MemoryStore::from_yaml_str(RULES).unwrap();
    let metrics = Arc::new(BridgeMetrics::default());
    let engine = MockEngine::new(Arc::new(store)).with_metrics(Arc::clone(&metrics));
    (engine, metrics)
}

async fn decide(engine: &MockEngine, url: &str, method: &str) -> MockOutcome {
    engine.decide(Some(PAGE), &InterceptedRequest::new(url, method)).await
}

#[tokio::test]
async fn matching_rule_is_mocked() {
    let (engine, metrics) = engine();
    let MockOutcome::Mock(res) = decide(&engine, "/api/user/42", "GET").await else {
        panic!("expected a mock");
    };
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({ "ok": true }));
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(metrics.decisions.get(&[("decision", "mock")]), 1);
}

#[tokio::test]
async fn absolute_request_urls_work_too() {
    let (engine, _) = engine();
    let out = decide(&engine, "https://sub.example.com/api/user/7?x=1", "GET").await;
    assert!(out.is_mock());
}

#[tokio::test]
async fn extra_segment_passes_through() {
    let (engine, metrics) = engine();
    assert_eq!(decide(&engine, "/api/user/42/extra", "GET").await, MockOutcome::PassThrough);
    assert_eq!(metrics.decisions.get(&[("decision", "pass_through")]), 1);
}

#[tokio::test]
async fn method_mismatch_passes_through() {
    let (engine, _) = engine();
    assert_eq!(decide(&engine, "/api/anything", "GET").await, MockOutcome::PassThrough);
    let MockOutcome::Mock(res) = decide(&engine, "/api/anything", "POST").await else {
        panic!("expected a mock");
    };
    assert_eq!(res.status, 201);
}

#[tokio::test]
async fn earlier_rule_wins() {
    let (engine, _) = engine();
    let MockOutcome::Mock(res) = decide(&engine, "/api/user/1", "GET").await else {
        panic!("expected a mock");
    };
    assert_eq!(res.body, json!({ "ok": true }));
}

#[tokio::test]
async fn malformed_body_passes_through() {
    let (engine, metrics) = engine();
    assert_eq!(decide(&engine, "/broken", "GET").await, MockOutcome::PassThrough);
    assert_eq!(metrics.decisions.get(&[("decision", "error")]), 1);
}

#[tokio::test]
async fn disabled_rules_and_projects_are_ignored() {
    let (engine, _) = engine();
    assert_eq!(decide(&engine, "/off", "GET").await, MockOutcome::PassThrough);
    assert_eq!(decide(&engine, "/never", "GET").await, MockOutcome::PassThrough);
}

#[tokio::test(start_paused = true)]
async fn delay_travels_with_the_response() {
    let (engine, _) = engine();
    let started = tokio::time::Instant::now();
    let MockOutcome::Mock(res) = decide(&engine, "/slow", "GET").await else {
        panic!("expected a mock");
    };
    assert_eq!(res.delay(), Duration::from_millis(1500));
    // the background answers at once; the page applies the delay
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[tokio::test]
async fn script_rule_builds_body() {
    let (engine, _) = engine();
    let MockOutcome::Mock(res) = decide(&engine, "/echo/ada?q=1", "GET").await else {
        panic!("expected a mock");
    };
    assert_eq!(res.body, json!({ "path": "/echo/ada", "q": "1" }));
}

#[tokio::test]
async fn scheme_and_host_scope_projects() {
    let (engine, _) = engine();
    let req = InterceptedRequest::new("/api/user/42", "GET");
    assert_eq!(engine.decide(Some("http://sub.example.com/"), &req).await, MockOutcome::PassThrough);
    assert_eq!(engine.decide(Some("https://example.com/"), &req).await, MockOutcome::PassThrough);
    assert!(engine.decide(Some("https://another.example.com/"), &req).await.is_mock());
}

#[tokio::test]
async fn unparseable_url_passes_through() {
    let (engine, _) = engine();
    let req = InterceptedRequest::new("http://[::1", "GET");
    assert_eq!(engine.decide(Some(PAGE), &req).await, MockOutcome::PassThrough);
    let relative = InterceptedRequest::new("/api/user/1", "GET");
    assert_eq!(engine.decide(None, &relative).await, MockOutcome::PassThrough);
}

#[tokio::test]
async fn domain_flag_gates_matching_and_injection() {
    let (engine, _) = engine();
    assert!(engine.should_intercept(PAGE).await.unwrap());
    assert!(!engine.should_intercept("https://other.org/").await.unwrap());

    let toggle = DomainToggle { domain: "sub.example.com".into(), enabled: false };
    assert!(engine.set_domain_enabled(&toggle).await.unwrap());

    assert!(!engine.should_intercept(PAGE).await.unwrap());
    assert_eq!(decide(&engine, "/api/user/42", "GET").await, MockOutcome::PassThrough);
    assert!(engine.should_intercept("https://another.example.com/").await.unwrap());
}

#[tokio::test]
async fn default_domain_flag_comes_from_config() {
    let store = MemoryStore::from_yaml_str(RULES).unwrap();
    let engine = MockEngine::new(Arc::new(store)).with_default_domain_enabled(false);
    assert!(!engine.should_intercept(PAGE).await.unwrap());
    assert_eq!(decide(&engine, "/api/user/42", "GET").await, MockOutcome::PassThrough);
}

#[tokio::test]
async fn service_uses_sender_url_as_page() {
    let (engine, _) = engine();
    let ctx = CallCtx::new().with_sender_url(PAGE);
    let call = BridgeCall::HandleRequest(InterceptedRequest::new("/api/user/42", "GET"));
    let value = engine.handle(ctx, call).await.unwrap();
    assert_eq!(value["kind"], "mock");
    assert_eq!(value["status"], 200);

    let no_page = BridgeCall::HandleRequest(InterceptedRequest::new("/api/user/42", "GET"));
    let value = engine.handle(CallCtx::new(), no_page).await.unwrap();
    assert_eq!(value, json!({ "kind": "pass_through" }));

    let check = BridgeCall::ShouldIntercept(PageInfo { page_url: PAGE.into() });
    assert_eq!(engine.handle(CallCtx::new(), check).await.unwrap(), json!(true));
}

#[tokio::test]
async fn patterns_are_compiled_once_across_calls() {
    let (engine, _) = engine();
    assert!(decide(&engine, "/api/user/1", "GET").await.is_mock());
    let compiled = engine.patterns().len();
    assert!(compiled > 0);

    for i in 2..50 {
        assert!(decide(&engine, &format!("/api/user/{i}"), "GET").await.is_mock());
    }
    assert_eq!(engine.patterns().len(), compiled);
}
