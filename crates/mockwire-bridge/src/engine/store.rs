//! Rule store collaborator.
//!
//! The engine only reads through `RuleStore`; writes (seeding, edits from an
//! options UI) go through the concrete store. Iteration order is insertion
//! order and is what decides ties between overlapping rules.

use std::collections::BTreeMap;
use std::fs;
use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::rules::{MockRule, Project};

#[async_trait]
pub trait RuleStore: Send + Sync + 'static {
    async fn projects(&self) -> Result<Vec<Project>>;

    async fn mock_apis(&self, project_id: &str) -> Result<Vec<MockRule>>;

    /// Stored per-domain flag, `None` when never set.
    async fn domain_enabled(&self, domain: &str) -> Result<Option<bool>>;

    async fn set_domain_enabled(&self, domain: &str, enabled: bool) -> Result<()>;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedFile {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default, rename = "domainEnabled")]
    domain_enabled: BTreeMap<String, bool>,
}

/// In-process store.
#[derive(Default)]
pub struct MemoryStore {
    projects: RwLock<Vec<Project>>,
    apis: DashMap<String, Vec<MockRule>>,
    domains: DashMap<String, bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects may carry their rules inline in `apis`; those are moved into
    /// the per-project rule lists.
    pub fn from_projects(projects: Vec<Project>) -> Self {
        let store = Self::new();
        for p in projects {
            store.insert_project(p);
        }
        store
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let seed: SeedFile = serde_yaml::from_str(s)
            .map_err(|e| MockWireError::InvalidRule(format!("invalid rules yaml: {e}")))?;
        let store = Self::from_projects(seed.projects);
        for (domain, enabled) in seed.domain_enabled {
            store.domains.insert(domain, enabled);
        }
        Ok(store)
    }

    pub fn load_seed_file(path: &str) -> Result<Self> {
        let s = fs::read_to_string(path)
            .map_err(|e| MockWireError::Internal(format!("read rules file failed: {e}")))?;
        Self::from_yaml_str(&s)
    }

    /// Add or replace a project (replacing keeps its position).
    pub fn insert_project(&self, mut project: Project) {
        let inline = std::mem::take(&mut project.apis);
        let id = project.id.clone();
        {
            let mut projects = self.projects.write().unwrap_or_else(|e| e.into_inner());
            match projects.iter().position(|p| p.id == id) {
                Some(i) => projects[i] = project,
                None => projects.push(project),
            }
        }
        for mut rule in inline {
            rule.project_id = id.clone();
            self.upsert_rule(rule);
        }
    }

    /// Drop a project and its rules.
    pub fn remove_project(&self, project_id: &str) -> bool {
        let mut projects = self.projects.write().unwrap_or_else(|e| e.into_inner());
        let before = projects.len();
        projects.retain(|p| p.id != project_id);
        self.apis.remove(project_id);
        projects.len() != before
    }

    /// Add or replace a rule by id within its project.
    pub fn upsert_rule(&self, rule: MockRule) {
        let mut rules = self.apis.entry(rule.project_id.clone()).or_default();
        match rules.iter().position(|r| r.id == rule.id) {
            Some(i) => rules[i] = rule,
            None => rules.push(rule),
        }
    }

    pub fn remove_rule(&self, project_id: &str, rule_id: &str) -> bool {
        match self.apis.get_mut(project_id) {
            Some(mut rules) => {
                let before = rules.len();
                rules.retain(|r| r.id != rule_id);
                rules.len() != before
            }
            None => false,
        }
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn projects(&self) -> Result<Vec<Project>> {
        Ok(self.projects.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn mock_apis(&self, project_id: &str) -> Result<Vec<MockRule>> {
        Ok(self.apis.get(project_id).map(|r| r.clone()).unwrap_or_default())
    }

    async fn domain_enabled(&self, domain: &str) -> Result<Option<bool>> {
        Ok(self.domains.get(domain).map(|v| *v))
    }

    async fn set_domain_enabled(&self, domain: &str, enabled: bool) -> Result<()> {
        self.domains.insert(domain.to_string(), enabled);
        Ok(())
    }
}
