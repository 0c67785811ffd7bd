//! Rule store records and per-call match types.
//!
//! Field names follow the store's camelCase JSON. Older stores wrote
//! `domain`, `responseBodyType: "javascript"` and `code`; those are accepted
//! as aliases.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Domain-scoping container for a group of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "domain")]
    pub domain_pattern: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Nested rules, only present in seed files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apis: Vec<MockRule>,
}

/// How a rule produces its response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    #[default]
    Json,
    #[serde(alias = "javascript")]
    Script,
}

/// One mocked endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRule {
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_status")]
    pub status_code: u16,
    /// Artificial latency in milliseconds.
    #[serde(default)]
    pub delay: u64,
    #[serde(default)]
    pub response_body: String,
    #[serde(default, alias = "responseBodyType")]
    pub response_body_kind: BodyKind,
    #[serde(default, alias = "code", skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Extra response headers; a `Content-Type` here replaces the default.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}
fn default_method() -> String {
    "GET".into()
}
fn default_status() -> u16 {
    200
}

/// Substitute response fabricated from a rule.
///
/// `delay_ms` is applied by the page side after the reply arrives, so it
/// never counts against a hop's call timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    #[serde(default, rename = "delayMs", skip_serializing_if = "is_zero")]
    pub delay_ms: u64,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl SyntheticResponse {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as transmitted: strings verbatim, everything else JSON-encoded.
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::String(s) if !self.is_json() => s.clone(),
            other => other.to_string(),
        }
    }

    fn is_json(&self) -> bool {
        self.header("content-type")
            .map(|v| v.to_ascii_lowercase().contains("json"))
            .unwrap_or(true)
    }
}

/// Decision returned for every `handleRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MockOutcome {
    Mock(SyntheticResponse),
    PassThrough,
}

impl MockOutcome {
    pub fn is_mock(&self) -> bool {
        matches!(self, MockOutcome::Mock(_))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_field_names_are_accepted() {
        let rule: MockRule = serde_json::from_value(json!({
            "id": "r1",
            "projectId": "p1",
            "path": "/api/x",
            "method": "POST",
            "statusCode": 201,
            "delay": 0,
            "responseBody": "",
            "responseBodyType": "javascript",
            "code": "#{ ok: true }",
            "enabled": true,
            "createdAt": 1700000000
        }))
        .unwrap();
        assert_eq!(rule.response_body_kind, BodyKind::Script);
        assert_eq!(rule.script.as_deref(), Some("#{ ok: true }"));

        let p: Project = serde_json::from_value(json!({ "id": "p1", "domain": "*.example.com" })).unwrap();
        assert_eq!(p.domain_pattern, "*.example.com");
        assert!(p.enabled);
    }

    #[test]
    fn outcome_wire_shape() {
        let v = serde_json::to_value(MockOutcome::PassThrough).unwrap();
        assert_eq!(v, json!({ "kind": "pass_through" }));

        let slow = SyntheticResponse { status: 200, headers: BTreeMap::new(), body: json!([]), delay_ms: 250 };
        let v = serde_json::to_value(MockOutcome::Mock(slow.clone())).unwrap();
        assert_eq!(v["delayMs"], json!(250));
        assert_eq!(serde_json::from_value::<MockOutcome>(v).unwrap(), MockOutcome::Mock(slow));
    }

    #[test]
    fn body_text_keeps_raw_strings_for_non_json() {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        let r = SyntheticResponse { status: 200, headers, body: json!("hi"), delay_ms: 0 };
        assert_eq!(r.body_text(), "hi");

        let r = SyntheticResponse { status: 200, headers: BTreeMap::new(), body: json!("hi"), delay_ms: 0 };
        assert_eq!(r.body_text(), "\"hi\"");
    }
}
