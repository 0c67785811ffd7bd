//! Script-kind response bodies.
//!
//! A script rule's body is produced by evaluating its snippet. The snippet
//! sees a `request` map (`url`, `method`, `path`, `query`, `body`, `page`) and
//! its final expression becomes the JSON response body.

use std::collections::BTreeMap;

use rhai::{Dynamic, Engine, Map, Scope};
use serde_json::Value;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::rules::MatchContext;

/// Request view handed to a body script.
#[derive(Debug, Clone, Default)]
pub struct ScriptRequest {
    pub url: String,
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<String>,
    pub page_url: Option<String>,
}

impl ScriptRequest {
    pub fn from_match(ctx: &MatchContext, body: Option<&str>) -> Self {
        Self {
            url: ctx.request_url.to_string(),
            method: ctx.method.clone(),
            path: ctx.path().to_string(),
            query: ctx
                .request_url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            body: body.map(str::to_string),
            page_url: ctx.page_url.as_ref().map(|u| u.to_string()),
        }
    }
}

/// Produces a body from a script snippet.
pub trait ScriptRunner: Send + Sync + 'static {
    fn run(&self, source: &str, req: &ScriptRequest) -> Result<Value>;
}

/// Rhai-backed runner with an operation cap so a runaway snippet fails
/// instead of hanging the background.
pub struct RhaiRunner {
    engine: Engine,
}

impl RhaiRunner {
    pub const DEFAULT_MAX_OPERATIONS: u64 = 100_000;

    pub fn new() -> Self {
        Self::with_max_operations(Self::DEFAULT_MAX_OPERATIONS)
    }

    pub fn with_max_operations(max: u64) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(max);
        engine.set_max_expr_depths(64, 32);
        engine.set_max_string_size(1024 * 1024);
        Self { engine }
    }
}

impl Default for RhaiRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRunner for RhaiRunner {
    fn run(&self, source: &str, req: &ScriptRequest) -> Result<Value> {
        let mut scope = Scope::new();
        scope.push("request", request_map(req));

        let out: Dynamic = self
            .engine
            .eval_with_scope(&mut scope, source)
            .map_err(|e| MockWireError::InvalidRule(format!("script failed: {e}")))?;

        rhai::serde::from_dynamic(&out)
            .map_err(|e| MockWireError::InvalidRule(format!("script result is not json: {e}")))
    }
}

fn request_map(req: &ScriptRequest) -> Map {
    let mut map = Map::new();
    map.insert("url".into(), Dynamic::from(req.url.clone()));
    map.insert("method".into(), Dynamic::from(req.method.clone()));
    map.insert("path".into(), Dynamic::from(req.path.clone()));

    let mut query = Map::new();
    for (k, v) in &req.query {
        query.insert(k.as_str().into(), Dynamic::from(v.clone()));
    }
    map.insert("query".into(), Dynamic::from(query));

    // JSON bodies are exposed structured, anything else as a string.
    let body = match &req.body {
        None => Dynamic::UNIT,
        Some(text) => serde_json::from_str::<Value>(text)
            .ok()
            .and_then(|v| rhai::serde::to_dynamic(v).ok())
            .unwrap_or_else(|| Dynamic::from(text.clone())),
    };
    map.insert("body".into(), body);
    map.insert(
        "page".into(),
        req.page_url.clone().map(Dynamic::from).unwrap_or(Dynamic::UNIT),
    );
    map
}
