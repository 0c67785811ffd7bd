//! Promise-style primitive and its interception.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::protocol::InterceptedRequest;
use mockwire_core::rules::{MockOutcome, SyntheticResponse};
use mockwire_core::status::status_text;

use crate::api::ExtensionApi;

/// A request object passed as the first argument instead of a URL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchRequest {
    pub url: String,
    pub method: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestInput {
    Url(String),
    Request(FetchRequest),
}

impl RequestInput {
    pub fn url(&self) -> &str {
        match self {
            RequestInput::Url(u) => u,
            RequestInput::Request(r) => &r.url,
        }
    }
}

impl From<&str> for RequestInput {
    fn from(u: &str) -> Self {
        RequestInput::Url(u.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(u: String) -> Self {
        RequestInput::Url(u)
    }
}

impl From<FetchRequest> for RequestInput {
    fn from(r: FetchRequest) -> Self {
        RequestInput::Request(r)
    }
}

/// Optional second argument.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestInit {
    pub method: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

/// Effective method: `init.method`, then the request object's, then GET.
pub fn effective_method(input: &RequestInput, init: Option<&RequestInit>) -> String {
    init.and_then(|i| i.method.clone())
        .or_else(|| match input {
            RequestInput::Request(r) => r.method.clone(),
            RequestInput::Url(_) => None,
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "GET".to_string())
}

fn effective_body(input: &RequestInput, init: Option<&RequestInit>) -> Option<String> {
    init.and_then(|i| i.body.clone()).or_else(|| match input {
        RequestInput::Request(r) => r.body.clone(),
        RequestInput::Url(_) => None,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub url: String,
}

impl FetchResponse {
    pub fn from_synthetic(url: &str, res: &SyntheticResponse) -> Self {
        Self {
            status: res.status,
            status_text: status_text(res.status).to_string(),
            headers: res.headers.clone(),
            body: Bytes::from(res.body_text()),
            url: url.to_string(),
        }
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| MockWireError::BadRequest(format!("response body is not json: {e}")))
    }
}

#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn fetch(&self, input: RequestInput, init: Option<RequestInit>) -> Result<FetchResponse>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    async fn fetch(&self, input: RequestInput, init: Option<RequestInit>) -> Result<FetchResponse> {
        (**self).fetch(input, init).await
    }
}

/// Drop-in replacement for a `Fetch` that asks the bridge first.
pub struct InterceptingFetch<F> {
    original: F,
    api: Arc<dyn ExtensionApi>,
}

impl<F: Fetch> InterceptingFetch<F> {
    pub fn new(original: F, api: Arc<dyn ExtensionApi>) -> Self {
        Self { original, api }
    }

    pub fn original(&self) -> &F {
        &self.original
    }
}

#[async_trait]
impl<F: Fetch> Fetch for InterceptingFetch<F> {
    async fn fetch(&self, input: RequestInput, init: Option<RequestInit>) -> Result<FetchResponse> {
        let req = InterceptedRequest {
            url: input.url().to_string(),
            method: effective_method(&input, init.as_ref()),
            body: effective_body(&input, init.as_ref()),
        };
        match self.api.handle_request(req).await {
            Ok(MockOutcome::Mock(res)) => {
                if res.delay_ms > 0 {
                    tokio::time::sleep(res.delay()).await;
                }
                tracing::debug!(url = input.url(), status = res.status, "fetch mocked");
                return Ok(FetchResponse::from_synthetic(input.url(), &res));
            }
            Ok(MockOutcome::PassThrough) => {}
            Err(e) => tracing::debug!(url = input.url(), error = %e, "bridge unavailable, passing through"),
        }
        self.original.fetch(input, init).await
    }
}
