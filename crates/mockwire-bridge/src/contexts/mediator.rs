//! Mediator context: sits between a page and the background.
//!
//! Serves `handleRequest` to the page by forwarding it on its own caller
//! (fresh ids for the second hop). It also decides whether the shim is
//! installed on its page at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::protocol::{BridgeCall, CallSet, PageInfo};

use crate::api::{BridgeClient, ExtensionApi};
use crate::obs::BridgeMetrics;
use crate::rpc::{CallCtx, Caller, Responder, Service};
use crate::transport::bus::{self, Source, WindowBus};

use super::background::Background;

pub const HOP: &str = "mediator";

/// Page-facing methods of the mediator.
pub struct ForwardingService {
    background: BridgeClient,
}

impl ForwardingService {
    pub fn new(background: BridgeClient) -> Self {
        Self { background }
    }
}

#[async_trait]
impl Service for ForwardingService {
    type Call = BridgeCall;

    async fn handle(&self, _ctx: CallCtx, call: BridgeCall) -> Result<Value> {
        match call {
            BridgeCall::HandleRequest(req) => {
                let outcome = self.background.handle_request(req).await?;
                serde_json::to_value(outcome)
                    .map_err(|e| MockWireError::Internal(format!("outcome encode failed: {e}")))
            }
            // Page code may only ask about requests.
            other => Err(MockWireError::MethodNotFound(other.method().to_string())),
        }
    }
}

pub struct Mediator {
    page_url: String,
    client: BridgeClient,
    tasks: Vec<JoinHandle<()>>,
}

impl Mediator {
    pub fn connect(
        background: &Background,
        page_url: impl Into<String>,
        timeout: Option<Duration>,
        metrics: Option<Arc<BridgeMetrics>>,
    ) -> Self {
        let page_url = page_url.into();
        let (port, replies) = background.port(Some(page_url.clone()));
        let mut caller = Caller::new(HOP, Arc::new(port)).with_timeout(timeout);
        if let Some(m) = metrics {
            caller = caller.with_metrics(m);
        }
        let caller = Arc::new(caller);
        let pump = caller.attach(replies);
        Self {
            page_url,
            client: BridgeClient::new(caller),
            tasks: vec![pump],
        }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn client(&self) -> &BridgeClient {
        &self.client
    }

    /// Ask the background whether this page gets the shim. Any failure means no.
    pub async fn should_install(&self) -> bool {
        let page = PageInfo { page_url: self.page_url.clone() };
        match self.client.should_intercept(page).await {
            Ok(yes) => yes,
            Err(e) => {
                tracing::warn!(page = %self.page_url, error = %e, "injection check failed");
                false
            }
        }
    }

    /// Start answering the page on `bus`.
    pub fn serve(&mut self, bus: &WindowBus) {
        let service = Arc::new(ForwardingService::new(self.client.clone()));
        let responder = Arc::new(Responder::new(HOP, service));
        let ctx = CallCtx::new().with_sender_url(self.page_url.as_str());
        self.tasks.push(bus::serve(
            bus,
            Source::InterceptorScript,
            Source::ContentScript,
            responder,
            ctx,
        ));
    }
}

impl Drop for Mediator {
    fn drop(&mut self) {
        for t in &self.tasks {
            t.abort();
        }
    }
}
