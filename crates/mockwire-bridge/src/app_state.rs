//! Shared application state for the bridge server.

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::contexts::background;
use crate::engine::{MockEngine, RuleStore};
use crate::obs::BridgeMetrics;
use crate::rpc::Responder;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: BridgeConfig,
    responder: Arc<Responder<MockEngine>>,
    metrics: Arc<BridgeMetrics>,
}

impl AppState {
    pub fn new(cfg: BridgeConfig, store: Arc<dyn RuleStore>) -> Self {
        let metrics = Arc::new(BridgeMetrics::default());
        let engine = MockEngine::new(store)
            .with_default_domain_enabled(cfg.interception.default_domain_enabled)
            .with_metrics(Arc::clone(&metrics));
        let responder = Arc::new(Responder::new(background::HOP, Arc::new(engine)));
        Self {
            inner: Arc::new(AppStateInner { cfg, responder, metrics }),
        }
    }

    pub fn cfg(&self) -> &BridgeConfig {
        &self.inner.cfg
    }

    pub fn responder(&self) -> Arc<Responder<MockEngine>> {
        Arc::clone(&self.inner.responder)
    }

    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
