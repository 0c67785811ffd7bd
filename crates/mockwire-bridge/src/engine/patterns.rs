//! Compiled pattern cache keyed by the raw pattern text.
//!
//! Rules are matched on every intercepted call, so each distinct path or
//! domain pattern is compiled once. A pattern that fails to compile is cached
//! as its error and reported again on lookup. Entries are never evicted:
//! the key set is bounded by the distinct patterns the store has held.

use std::sync::Arc;

use dashmap::DashMap;

use mockwire_core::error::Result;
use mockwire_core::rules::{DomainPattern, PathPattern, Patterns};

#[derive(Default)]
pub struct PatternCache {
    paths: DashMap<String, Result<Arc<PathPattern>>>,
    domains: DashMap<String, Result<Arc<DomainPattern>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.paths.len() + self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Patterns for PatternCache {
    fn path(&self, raw: &str) -> Result<Arc<PathPattern>> {
        if let Some(hit) = self.paths.get(raw) {
            return hit.value().clone();
        }
        self.paths
            .entry(raw.to_string())
            .or_insert_with(|| PathPattern::compile(raw).map(Arc::new))
            .value()
            .clone()
    }

    fn domain(&self, raw: &str) -> Result<Arc<DomainPattern>> {
        if let Some(hit) = self.domains.get(raw) {
            return hit.value().clone();
        }
        self.domains
            .entry(raw.to_string())
            .or_insert_with(|| DomainPattern::compile(raw).map(Arc::new))
            .value()
            .clone()
    }
}
