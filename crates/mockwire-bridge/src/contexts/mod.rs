//! In-process assembly of the three contexts.
//!
//! ```text
//! page shim -> Caller(page) ~bus~> Responder(mediator) -> Caller(mediator)
//!   ~runtime~> Responder(background) -> MockEngine
//! ```

pub mod background;
pub mod mediator;
pub mod page;

use std::sync::Arc;
use std::time::Duration;

use crate::config::BridgeConfig;
use crate::engine::{MockEngine, RuleStore};
use crate::obs::BridgeMetrics;
use crate::shim::{Fetch, Shim, XhrFactory};
use crate::transport::bus::WindowBus;

pub use background::Background;
pub use mediator::{ForwardingService, Mediator};
pub use page::Page;

pub struct Extension {
    background: Background,
    timeout: Option<Duration>,
    metrics: Arc<BridgeMetrics>,
}

/// A page the extension has been attached to.
pub struct OpenedPage<F, X> {
    pub page: Page,
    pub mediator: Mediator,
    pub bus: WindowBus,
    pub shim: Shim<F, X>,
}

impl Extension {
    pub fn launch(cfg: &BridgeConfig, store: Arc<dyn RuleStore>) -> Self {
        let metrics = Arc::new(BridgeMetrics::default());
        let engine = MockEngine::new(store)
            .with_default_domain_enabled(cfg.interception.default_domain_enabled)
            .with_metrics(Arc::clone(&metrics));
        let background = Background::spawn(Arc::new(engine));
        Self {
            background,
            timeout: cfg.bridge.call_timeout(),
            metrics,
        }
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn metrics(&self) -> &Arc<BridgeMetrics> {
        &self.metrics
    }

    /// Attach to a page. `None` when the page is not eligible (domain
    /// disabled, or no project scoped to it); its primitives stay untouched.
    pub async fn open_page<F: Fetch, X: XhrFactory>(
        &self,
        page_url: &str,
        fetch: F,
        xhr: X,
    ) -> Option<OpenedPage<F, X>> {
        let mut mediator = Mediator::connect(
            &self.background,
            page_url,
            self.timeout,
            Some(Arc::clone(&self.metrics)),
        );
        if !mediator.should_install().await {
            tracing::debug!(page = page_url, "shim not installed");
            return None;
        }

        let bus = WindowBus::new();
        mediator.serve(&bus);
        let page = Page::connect(page_url, &bus, self.timeout, Some(Arc::clone(&self.metrics)));
        let shim = page.install(fetch, xhr);
        Some(OpenedPage { page, mediator, bus, shim })
    }
}
