//! Background-side mock engine.
//!
//! Fails open: anything that goes wrong while deciding (unparseable URL,
//! unreachable store, bad rule body, failing script) answers `PassThrough`
//! so the page falls back to the real network.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::protocol::{BridgeCall, DomainToggle, InterceptedRequest};
use mockwire_core::rules::{project_applies_with, select_rule_with, MatchContext, MockOutcome, MockRule};

use crate::obs::BridgeMetrics;
use crate::rpc::{CallCtx, Service};

use super::patterns::PatternCache;
use super::script::{RhaiRunner, ScriptRunner};
use super::store::RuleStore;
use super::synth::synthesize;

pub struct MockEngine {
    store: Arc<dyn RuleStore>,
    scripts: Arc<dyn ScriptRunner>,
    patterns: PatternCache,
    default_domain_enabled: bool,
    metrics: Option<Arc<BridgeMetrics>>,
}

impl MockEngine {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store,
            scripts: Arc::new(RhaiRunner::new()),
            patterns: PatternCache::new(),
            default_domain_enabled: true,
            metrics: None,
        }
    }

    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptRunner>) -> Self {
        self.scripts = scripts;
        self
    }

    /// Flag used for domains the store has no entry for.
    pub fn with_default_domain_enabled(mut self, enabled: bool) -> Self {
        self.default_domain_enabled = enabled;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<BridgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    /// Decide one intercepted call made from `page_url`.
    pub async fn decide(&self, page_url: Option<&str>, req: &InterceptedRequest) -> MockOutcome {
        let (outcome, label) = match self.try_decide(page_url, req).await {
            Ok(Some(outcome)) => (outcome, "mock"),
            Ok(None) => (MockOutcome::PassThrough, "pass_through"),
            Err(MockWireError::BadRequest(msg)) => {
                tracing::debug!(url = %req.url, %msg, "request url not matchable");
                (MockOutcome::PassThrough, "pass_through")
            }
            Err(e) => {
                tracing::warn!(url = %req.url, method = %req.method, error = %e, "mock decision failed, passing through");
                (MockOutcome::PassThrough, "error")
            }
        };
        if let Some(m) = &self.metrics {
            m.decisions.inc(&[("decision", label)]);
        }
        outcome
    }

    async fn try_decide(
        &self,
        page_url: Option<&str>,
        req: &InterceptedRequest,
    ) -> Result<Option<MockOutcome>> {
        let ctx = MatchContext::new(&req.url, &req.method, page_url)?;

        if let Some(host) = ctx.scope_url().host_str() {
            if !self.domain_flag(host).await? {
                tracing::debug!(host, "domain disabled");
                return Ok(None);
            }
        }

        let Some(rule) = self.find_rule(&ctx).await? else {
            return Ok(None);
        };

        let response = synthesize(&rule, &ctx, req.body.as_deref(), self.scripts.as_ref())?;
        tracing::debug!(rule = %rule.id, status = response.status, delay_ms = response.delay_ms, path = ctx.path(), "mocked");
        Ok(Some(MockOutcome::Mock(response)))
    }

    /// First matching rule, projects in store order then rules in store order.
    async fn find_rule(&self, ctx: &MatchContext) -> Result<Option<MockRule>> {
        let projects = self.store.projects().await?;
        for project in projects.iter().filter(|p| project_applies_with(&self.patterns, p, ctx.scope_url())) {
            let rules = self.store.mock_apis(&project.id).await?;
            if let Some(rule) = select_rule_with(&self.patterns, &rules, ctx) {
                return Ok(Some(rule.clone()));
            }
        }
        Ok(None)
    }

    /// Whether the shim belongs on this page: its domain is enabled and some
    /// enabled project is scoped to it.
    pub async fn should_intercept(&self, page_url: &str) -> Result<bool> {
        let url = Url::parse(page_url)
            .map_err(|e| MockWireError::BadRequest(format!("unparseable page url {page_url}: {e}")))?;
        let Some(host) = url.host_str() else {
            return Ok(false);
        };
        if !self.domain_flag(host).await? {
            return Ok(false);
        }
        let projects = self.store.projects().await?;
        Ok(projects.iter().any(|p| project_applies_with(&self.patterns, p, &url)))
    }

    pub async fn set_domain_enabled(&self, toggle: &DomainToggle) -> Result<bool> {
        self.store.set_domain_enabled(&toggle.domain, toggle.enabled).await?;
        tracing::info!(domain = %toggle.domain, enabled = toggle.enabled, "domain flag updated");
        Ok(true)
    }

    async fn domain_flag(&self, host: &str) -> Result<bool> {
        Ok(self
            .store
            .domain_enabled(host)
            .await?
            .unwrap_or(self.default_domain_enabled))
    }
}

#[async_trait]
impl Service for MockEngine {
    type Call = BridgeCall;

    async fn handle(&self, ctx: CallCtx, call: BridgeCall) -> Result<Value> {
        match call {
            BridgeCall::HandleRequest(req) => {
                let outcome = self.decide(ctx.sender_url(), &req).await;
                serde_json::to_value(outcome)
                    .map_err(|e| MockWireError::Internal(format!("outcome encode failed: {e}")))
            }
            BridgeCall::SetDomainEnabled(toggle) => self.set_domain_enabled(&toggle).await.map(Value::Bool),
            BridgeCall::ShouldIntercept(page) => self.should_intercept(&page.page_url).await.map(Value::Bool),
        }
    }
}
