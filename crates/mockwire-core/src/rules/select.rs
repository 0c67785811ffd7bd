//! Rule selection.
//!
//! Policy: the first enabled rule, in store iteration order, whose path and
//! method both match wins. There is no specificity ranking, so a catch-all
//! `/api/*` listed before `/api/user/:id` shadows it. Reordering rules in the
//! store changes which one answers.

use std::sync::Arc;

use url::Url;

use crate::error::{MockWireError, Result};

use super::model::{MockRule, Project};
use super::pattern::{DomainPattern, PathPattern};

/// Everything needed to match one intercepted call. Built per call.
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub request_url: Url,
    pub method: String,
    pub page_url: Option<Url>,
}

impl MatchContext {
    /// Resolve `request_url` against the page URL (relative URLs are common in
    /// page code) and normalise an empty method to `GET`.
    pub fn new(request_url: &str, method: &str, page_url: Option<&str>) -> Result<Self> {
        let page_url = page_url.and_then(|p| Url::parse(p).ok());
        let request_url = match &page_url {
            Some(base) => base.join(request_url),
            None => Url::parse(request_url),
        }
        .map_err(|e| MockWireError::BadRequest(format!("unparseable request url {request_url}: {e}")))?;

        let method = if method.is_empty() { "GET" } else { method };
        Ok(Self {
            request_url,
            method: method.to_string(),
            page_url,
        })
    }

    pub fn path(&self) -> &str {
        self.request_url.path()
    }

    /// URL used for project scoping: the page when known, else the request.
    pub fn scope_url(&self) -> &Url {
        self.page_url.as_ref().unwrap_or(&self.request_url)
    }
}

/// Source of compiled patterns. Callers that match often keep compiled
/// patterns around; `Uncompiled` builds them on every lookup.
pub trait Patterns {
    fn path(&self, raw: &str) -> Result<Arc<PathPattern>>;
    fn domain(&self, raw: &str) -> Result<Arc<DomainPattern>>;
}

/// Compiles on every lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uncompiled;

impl Patterns for Uncompiled {
    fn path(&self, raw: &str) -> Result<Arc<PathPattern>> {
        PathPattern::compile(raw).map(Arc::new)
    }

    fn domain(&self, raw: &str) -> Result<Arc<DomainPattern>> {
        DomainPattern::compile(raw).map(Arc::new)
    }
}

/// Whether a project is enabled and scoped to the given URL.
pub fn project_applies(project: &Project, url: &Url) -> bool {
    project_applies_with(&Uncompiled, project, url)
}

pub fn project_applies_with<P: Patterns + ?Sized>(patterns: &P, project: &Project, url: &Url) -> bool {
    if !project.enabled {
        return false;
    }
    match patterns.domain(&project.domain_pattern) {
        Ok(p) => p.matches(url),
        Err(e) => {
            tracing::warn!(project = %project.id, error = %e, "skipping project with bad domain pattern");
            false
        }
    }
}

/// Whether a single rule answers the call (enabled, path and method match).
pub fn rule_matches(rule: &MockRule, ctx: &MatchContext) -> bool {
    rule_matches_with(&Uncompiled, rule, ctx)
}

pub fn rule_matches_with<P: Patterns + ?Sized>(patterns: &P, rule: &MockRule, ctx: &MatchContext) -> bool {
    if !rule.enabled || rule.method != ctx.method {
        return false;
    }
    match patterns.path(&rule.path) {
        Ok(p) => p.is_match(ctx.path()),
        Err(e) => {
            tracing::warn!(rule = %rule.id, error = %e, "skipping rule with bad path pattern");
            false
        }
    }
}

/// First matching rule in iteration order.
pub fn select_rule<'a, I>(rules: I, ctx: &MatchContext) -> Option<&'a MockRule>
where
    I: IntoIterator<Item = &'a MockRule>,
{
    select_rule_with(&Uncompiled, rules, ctx)
}

pub fn select_rule_with<'a, P, I>(patterns: &P, rules: I, ctx: &MatchContext) -> Option<&'a MockRule>
where
    P: Patterns + ?Sized,
    I: IntoIterator<Item = &'a MockRule>,
{
    rules.into_iter().find(|r| rule_matches_with(patterns, r, ctx))
}
