//! Event-style primitive and its interception.
//!
//! `InterceptedXhr` wraps any `XhrHandle` and keeps its surface. `open` is
//! forwarded at once; `send` is held until the bridge answers. A mock is
//! delivered on the wrapper itself and the inner handle never sends. A
//! pass-through forwards `send` to the inner handle, which then fires its own
//! events to the same listeners.
//!
//! `abort` (or a new `open`) invalidates any answer still in flight: the
//! check happens once the answer and its rule delay have elapsed, and again
//! before each event.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use mockwire_core::protocol::InterceptedRequest;
use mockwire_core::rules::{MockOutcome, SyntheticResponse};
use mockwire_core::status::status_text;

use crate::api::ExtensionApi;

use super::events::{EventKind, EventTarget, Listener};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum ReadyState {
    #[default]
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

pub trait XhrHandle: Send + Sync + 'static {
    fn open(&self, method: &str, url: &str);
    fn send(&self, body: Option<String>);
    fn abort(&self);
    fn ready_state(&self) -> ReadyState;
    fn status(&self) -> u16;
    fn status_text(&self) -> String;
    fn response_text(&self) -> String;
    fn response_header(&self, name: &str) -> Option<String>;
    fn add_event_listener(&self, kind: EventKind, listener: Listener);
    /// The `on<event>` slot.
    fn set_handler(&self, kind: EventKind, handler: Option<Listener>);
}

impl<T: XhrHandle + ?Sized> XhrHandle for Arc<T> {
    fn open(&self, method: &str, url: &str) {
        (**self).open(method, url)
    }
    fn send(&self, body: Option<String>) {
        (**self).send(body)
    }
    fn abort(&self) {
        (**self).abort()
    }
    fn ready_state(&self) -> ReadyState {
        (**self).ready_state()
    }
    fn status(&self) -> u16 {
        (**self).status()
    }
    fn status_text(&self) -> String {
        (**self).status_text()
    }
    fn response_text(&self) -> String {
        (**self).response_text()
    }
    fn response_header(&self, name: &str) -> Option<String> {
        (**self).response_header(name)
    }
    fn add_event_listener(&self, kind: EventKind, listener: Listener) {
        (**self).add_event_listener(kind, listener)
    }
    fn set_handler(&self, kind: EventKind, handler: Option<Listener>) {
        (**self).set_handler(kind, handler)
    }
}

/// Constructor for handles (the `new XMLHttpRequest()` of a context).
pub trait XhrFactory: Send + Sync + 'static {
    type Handle: XhrHandle;

    fn create(&self) -> Self::Handle;
}

#[derive(Debug, Clone)]
struct Synthetic {
    status: u16,
    status_text: &'static str,
    headers: BTreeMap<String, String>,
    body: String,
}

impl Synthetic {
    fn from_response(res: &SyntheticResponse) -> Self {
        Self {
            status: res.status,
            status_text: status_text(res.status),
            headers: res.headers.clone(),
            body: res.body_text(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    method: String,
    url: String,
    generation: u64,
    aborted: bool,
    synthetic: Option<Synthetic>,
}

pub struct InterceptedXhr<H> {
    me: Weak<Self>,
    inner: H,
    api: Arc<dyn ExtensionApi>,
    state: Mutex<State>,
    events: EventTarget,
}

impl<H: XhrHandle> InterceptedXhr<H> {
    pub fn new(inner: H, api: Arc<dyn ExtensionApi>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            inner,
            api,
            state: Mutex::new(State::default()),
            events: EventTarget::new(),
        })
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        let st = self.state();
        st.generation == generation && !st.aborted
    }

    async fn resolve(&self, generation: u64, req: InterceptedRequest, body: Option<String>) {
        let outcome = match self.api.handle_request(req).await {
            Ok(o) => o,
            Err(e) => {
                tracing::debug!(error = %e, "bridge unavailable, passing through");
                MockOutcome::PassThrough
            }
        };

        match outcome {
            MockOutcome::Mock(res) => {
                if res.delay_ms > 0 {
                    tokio::time::sleep(res.delay()).await;
                }
                {
                    let mut st = self.state();
                    if st.generation != generation || st.aborted {
                        tracing::debug!(url = %st.url, "xhr aborted before mock landed");
                        return;
                    }
                    st.synthetic = Some(Synthetic::from_response(&res));
                }
                for kind in [EventKind::ReadyStateChange, EventKind::Load, EventKind::LoadEnd] {
                    if !self.is_current(generation) {
                        return;
                    }
                    self.events.dispatch(kind);
                }
            }
            MockOutcome::PassThrough => {
                if self.is_current(generation) {
                    self.inner.send(body);
                }
            }
        }
    }
}

impl<H: XhrHandle> XhrHandle for InterceptedXhr<H> {
    fn open(&self, method: &str, url: &str) {
        {
            let mut st = self.state();
            st.generation += 1;
            st.aborted = false;
            st.synthetic = None;
            st.method = if method.is_empty() { "GET".into() } else { method.to_string() };
            st.url = url.to_string();
        }
        self.inner.open(method, url);
    }

    fn send(&self, body: Option<String>) {
        let (generation, req) = {
            let st = self.state();
            let req = InterceptedRequest {
                url: st.url.clone(),
                method: st.method.clone(),
                body: body.clone(),
            };
            (st.generation, req)
        };
        let Some(me) = self.me.upgrade() else { return };
        tokio::spawn(async move {
            me.resolve(generation, req, body).await;
        });
    }

    fn abort(&self) {
        self.state().aborted = true;
        self.inner.abort();
    }

    fn ready_state(&self) -> ReadyState {
        if self.state().synthetic.is_some() {
            return ReadyState::Done;
        }
        self.inner.ready_state()
    }

    fn status(&self) -> u16 {
        match &self.state().synthetic {
            Some(s) => s.status,
            None => self.inner.status(),
        }
    }

    fn status_text(&self) -> String {
        match &self.state().synthetic {
            Some(s) => s.status_text.to_string(),
            None => self.inner.status_text(),
        }
    }

    fn response_text(&self) -> String {
        match &self.state().synthetic {
            Some(s) => s.body.clone(),
            None => self.inner.response_text(),
        }
    }

    fn response_header(&self, name: &str) -> Option<String> {
        match &self.state().synthetic {
            Some(s) => s
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone()),
            None => self.inner.response_header(name),
        }
    }

    fn add_event_listener(&self, kind: EventKind, listener: Listener) {
        self.events.add_listener(kind, Arc::clone(&listener));
        self.inner.add_event_listener(kind, listener);
    }

    fn set_handler(&self, kind: EventKind, handler: Option<Listener>) {
        self.events.set_handler(kind, handler.clone());
        self.inner.set_handler(kind, handler);
    }
}

/// Factory producing intercepted handles around another factory's handles.
pub struct InterceptingXhrFactory<F> {
    original: F,
    api: Arc<dyn ExtensionApi>,
}

impl<F: XhrFactory> InterceptingXhrFactory<F> {
    pub fn new(original: F, api: Arc<dyn ExtensionApi>) -> Self {
        Self { original, api }
    }
}

impl<F: XhrFactory> XhrFactory for InterceptingXhrFactory<F> {
    type Handle = Arc<InterceptedXhr<F::Handle>>;

    fn create(&self) -> Self::Handle {
        InterceptedXhr::new(self.original.create(), Arc::clone(&self.api))
    }
}
