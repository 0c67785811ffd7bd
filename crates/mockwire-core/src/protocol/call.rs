//! Typed bridge API carried inside envelopes.
//!
//! On the wire a call is a method name plus a JSON payload. Responders decode
//! that pair into one variant of a call enum, so handlers only ever see
//! strongly typed payloads. An unknown method name surfaces as
//! `MockWireError::MethodNotFound`; a known method with a bad payload is a
//! `BadRequest`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MockWireError, Result};

/// A closed set of methods a responder can decode.
pub trait CallSet: Sized + Send + 'static {
    /// Method name of this call.
    fn method(&self) -> &'static str;

    /// Split into `(method, payload)` for the wire.
    fn into_parts(self) -> Result<(&'static str, Value)>;

    /// Decode `(method, payload)` received from the wire.
    fn from_parts(method: &str, data: Value) -> Result<Self>;
}

/// One intercepted network call, as seen by the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedRequest {
    /// Absolute or page-relative URL.
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl InterceptedRequest {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            body: None,
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainToggle {
    pub domain: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_url: String,
}

/// Methods served across the page -> mediator -> background chain.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall {
    /// Ask whether a request is mocked. Replies with a `MockOutcome`.
    HandleRequest(InterceptedRequest),
    /// Flip the per-domain enabled flag. Replies with `true`.
    SetDomainEnabled(DomainToggle),
    /// Ask whether the shim should be installed on a page. Replies with a bool.
    ShouldIntercept(PageInfo),
}

impl BridgeCall {
    pub const HANDLE_REQUEST: &'static str = "handleRequest";
    pub const SET_DOMAIN_ENABLED: &'static str = "setDomainEnabled";
    pub const SHOULD_INTERCEPT: &'static str = "shouldIntercept";
}

impl CallSet for BridgeCall {
    fn method(&self) -> &'static str {
        match self {
            BridgeCall::HandleRequest(_) => Self::HANDLE_REQUEST,
            BridgeCall::SetDomainEnabled(_) => Self::SET_DOMAIN_ENABLED,
            BridgeCall::ShouldIntercept(_) => Self::SHOULD_INTERCEPT,
        }
    }

    fn into_parts(self) -> Result<(&'static str, Value)> {
        let method = self.method();
        let data = match self {
            BridgeCall::HandleRequest(p) => encode(&p)?,
            BridgeCall::SetDomainEnabled(p) => encode(&p)?,
            BridgeCall::ShouldIntercept(p) => encode(&p)?,
        };
        Ok((method, data))
    }

    fn from_parts(method: &str, data: Value) -> Result<Self> {
        match method {
            Self::HANDLE_REQUEST => decode(method, data).map(BridgeCall::HandleRequest),
            Self::SET_DOMAIN_ENABLED => decode(method, data).map(BridgeCall::SetDomainEnabled),
            Self::SHOULD_INTERCEPT => decode(method, data).map(BridgeCall::ShouldIntercept),
            other => Err(MockWireError::MethodNotFound(other.to_string())),
        }
    }
}

fn encode<T: Serialize>(payload: &T) -> Result<Value> {
    serde_json::to_value(payload)
        .map_err(|e| MockWireError::Internal(format!("payload encode failed: {e}")))
}

fn decode<T: DeserializeOwned>(method: &str, data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| MockWireError::BadRequest(format!("{method} invalid data: {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn method_defaults_to_get() {
        let call = BridgeCall::from_parts("handleRequest", json!({ "url": "/api/user/1" })).unwrap();
        assert_eq!(
            call,
            BridgeCall::HandleRequest(InterceptedRequest::new("/api/user/1", "GET"))
        );
    }

    #[test]
    fn unknown_method_is_not_found() {
        let err = BridgeCall::from_parts("getProjects", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "not method getProjects found");
    }

    #[test]
    fn bad_payload_is_bad_request() {
        let err = BridgeCall::from_parts("setDomainEnabled", json!({ "domain": 1 })).unwrap_err();
        assert_eq!(err.code().as_str(), "BAD_REQUEST");
    }

    #[test]
    fn parts_use_camel_case() {
        let (m, data) = BridgeCall::ShouldIntercept(PageInfo {
            page_url: "https://a.example.com/".into(),
        })
        .into_parts()
        .unwrap();
        assert_eq!(m, "shouldIntercept");
        assert_eq!(data, json!({ "pageUrl": "https://a.example.com/" }));
    }
}
