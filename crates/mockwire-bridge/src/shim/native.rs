//! Real network primitives for the shim to wrap.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::status::status_text;

use super::events::{EventKind, EventTarget, Listener};
use super::fetch::{effective_method, Fetch, FetchRequest, FetchResponse, RequestInit, RequestInput};
use super::xhr::{ReadyState, XhrFactory, XhrHandle};

/// `Fetch` over reqwest. Relative URLs resolve against `base` (the page).
#[derive(Clone)]
pub struct ReqwestFetch {
    client: reqwest::Client,
    base: Option<Url>,
}

impl ReqwestFetch {
    pub fn new(base: Option<Url>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MockWireError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self { client, base })
    }

    pub fn with_client(client: reqwest::Client, base: Option<Url>) -> Self {
        Self { client, base }
    }

    fn resolve(&self, raw: &str) -> Result<Url> {
        match &self.base {
            Some(base) => base.join(raw),
            None => Url::parse(raw),
        }
        .map_err(|e| MockWireError::BadRequest(format!("invalid request url {raw}: {e}")))
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    async fn fetch(&self, input: RequestInput, init: Option<RequestInit>) -> Result<FetchResponse> {
        let url = self.resolve(input.url())?;
        let method = reqwest::Method::from_bytes(effective_method(&input, init.as_ref()).as_bytes())
            .map_err(|e| MockWireError::BadRequest(format!("invalid method: {e}")))?;

        let (mut headers, mut body) = match input {
            RequestInput::Request(FetchRequest { headers, body, .. }) => (headers, body),
            RequestInput::Url(_) => (BTreeMap::new(), None),
        };
        if let Some(init) = init {
            headers.extend(init.headers);
            if init.body.is_some() {
                body = init.body;
            }
        }

        let mut builder = self.client.request(method, url);
        for (k, v) in &headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        if let Some(b) = body {
            builder = builder.body(b);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| MockWireError::Transport(format!("request failed: {e}")))?;

        let status = resp.status();
        let final_url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| MockWireError::Transport(format!("read body failed: {e}")))?;

        let text = match status_text(status.as_u16()) {
            "" => status.canonical_reason().unwrap_or(""),
            t => t,
        };
        Ok(FetchResponse {
            status: status.as_u16(),
            status_text: text.to_string(),
            headers,
            body,
            url: final_url,
        })
    }
}

#[derive(Default)]
struct NativeState {
    method: String,
    url: String,
    ready: ReadyState,
    generation: u64,
    in_flight: bool,
    status: u16,
    status_text: String,
    headers: BTreeMap<String, String>,
    body: Bytes,
}

/// XHR-style handle driven by a `Fetch`.
pub struct NativeXhr<F> {
    me: Weak<Self>,
    fetch: Arc<F>,
    state: Mutex<NativeState>,
    events: EventTarget,
}

impl<F: Fetch> NativeXhr<F> {
    pub fn new(fetch: Arc<F>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            fetch,
            state: Mutex::new(NativeState::default()),
            events: EventTarget::new(),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, NativeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run(&self, generation: u64, input: RequestInput, init: RequestInit) {
        let result = self.fetch.fetch(input, Some(init)).await;
        {
            let mut st = self.state();
            if st.generation != generation || !st.in_flight {
                return;
            }
            st.in_flight = false;
            st.ready = ReadyState::Done;
            match &result {
                Ok(resp) => {
                    st.status = resp.status;
                    st.status_text = resp.status_text.clone();
                    st.headers = resp.headers.clone();
                    st.body = resp.body.clone();
                }
                Err(e) => {
                    tracing::debug!(url = %st.url, error = %e, "xhr network error");
                    st.status = 0;
                    st.status_text.clear();
                }
            }
        }
        self.events.dispatch(EventKind::ReadyStateChange);
        self.events.dispatch(if result.is_ok() { EventKind::Load } else { EventKind::Error });
        self.events.dispatch(EventKind::LoadEnd);
    }
}

impl<F: Fetch> XhrHandle for NativeXhr<F> {
    fn open(&self, method: &str, url: &str) {
        {
            let mut st = self.state();
            st.generation += 1;
            st.in_flight = false;
            st.method = if method.is_empty() { "GET".into() } else { method.to_string() };
            st.url = url.to_string();
            st.ready = ReadyState::Opened;
            st.status = 0;
            st.status_text.clear();
            st.headers.clear();
            st.body = Bytes::new();
        }
        self.events.dispatch(EventKind::ReadyStateChange);
    }

    fn send(&self, body: Option<String>) {
        let (generation, input, init) = {
            let mut st = self.state();
            if st.ready != ReadyState::Opened || st.in_flight {
                tracing::debug!(url = %st.url, "send ignored: handle not opened");
                return;
            }
            st.in_flight = true;
            let init = RequestInit { method: Some(st.method.clone()), body, ..RequestInit::default() };
            (st.generation, RequestInput::Url(st.url.clone()), init)
        };
        let Some(me) = self.me.upgrade() else { return };
        tokio::spawn(async move {
            me.run(generation, input, init).await;
        });
    }

    fn abort(&self) {
        {
            let mut st = self.state();
            if !st.in_flight {
                st.ready = ReadyState::Unsent;
                return;
            }
            st.in_flight = false;
            st.ready = ReadyState::Done;
            st.status = 0;
        }
        self.events.dispatch(EventKind::ReadyStateChange);
        self.events.dispatch(EventKind::Abort);
        self.events.dispatch(EventKind::LoadEnd);
        self.state().ready = ReadyState::Unsent;
    }

    fn ready_state(&self) -> ReadyState {
        self.state().ready
    }

    fn status(&self) -> u16 {
        self.state().status
    }

    fn status_text(&self) -> String {
        self.state().status_text.clone()
    }

    fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.state().body).into_owned()
    }

    fn response_header(&self, name: &str) -> Option<String> {
        self.state()
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    fn add_event_listener(&self, kind: EventKind, listener: Listener) {
        self.events.add_listener(kind, listener);
    }

    fn set_handler(&self, kind: EventKind, handler: Option<Listener>) {
        self.events.set_handler(kind, handler);
    }
}

pub struct NativeXhrFactory<F> {
    fetch: Arc<F>,
}

impl<F: Fetch> NativeXhrFactory<F> {
    pub fn new(fetch: Arc<F>) -> Self {
        Self { fetch }
    }
}

impl<F: Fetch> XhrFactory for NativeXhrFactory<F> {
    type Handle = Arc<NativeXhr<F>>;

    fn create(&self) -> Self::Handle {
        NativeXhr::new(Arc::clone(&self.fetch))
    }
}
