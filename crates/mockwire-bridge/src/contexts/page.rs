//! Page context: the shim's side of the window bus.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::api::{BridgeClient, ExtensionApi};
use crate::obs::BridgeMetrics;
use crate::rpc::Caller;
use crate::shim::{self, Fetch, Shim, XhrFactory};
use crate::transport::bus::{self, Source, WindowBus};

pub const HOP: &str = "page";

pub struct Page {
    url: String,
    client: BridgeClient,
    pump: JoinHandle<()>,
}

impl Page {
    pub fn connect(
        url: impl Into<String>,
        bus: &WindowBus,
        timeout: Option<Duration>,
        metrics: Option<Arc<BridgeMetrics>>,
    ) -> Self {
        let mut caller = Caller::new(HOP, Arc::new(bus.outbound(Source::InterceptorScript)))
            .with_timeout(timeout);
        if let Some(m) = metrics {
            caller = caller.with_metrics(m);
        }
        let caller = Arc::new(caller);
        let pump = bus::pump(bus, Source::ContentScript, Arc::clone(&caller));
        Self { url: url.into(), client: BridgeClient::new(caller), pump }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> &BridgeClient {
        &self.client
    }

    /// Wrap the page's primitives.
    pub fn install<F: Fetch, X: XhrFactory>(&self, fetch: F, xhr: X) -> Shim<F, X> {
        let api: Arc<dyn ExtensionApi> = Arc::new(self.client.clone());
        shim::install(api, fetch, xhr)
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
