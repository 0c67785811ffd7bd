//! Response synthesis from a matched rule.

use std::collections::BTreeMap;

use serde_json::Value;

use mockwire_core::error::{MockWireError, Result};
use mockwire_core::rules::{BodyKind, MatchContext, MockRule, SyntheticResponse};

use super::script::{ScriptRequest, ScriptRunner};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// Build the response a rule describes. A body that cannot be produced is an
/// `InvalidRule` error; the caller treats that as no match.
pub fn synthesize(
    rule: &MockRule,
    ctx: &MatchContext,
    request_body: Option<&str>,
    scripts: &dyn ScriptRunner,
) -> Result<SyntheticResponse> {
    let body = match rule.response_body_kind {
        BodyKind::Json => serde_json::from_str::<Value>(&rule.response_body).map_err(|e| {
            MockWireError::InvalidRule(format!("rule {} body is not json: {e}", rule.id))
        })?,
        BodyKind::Script => {
            let source = rule.script.as_deref().unwrap_or(&rule.response_body);
            scripts.run(source, &ScriptRequest::from_match(ctx, request_body))?
        }
    };

    Ok(SyntheticResponse {
        status: rule.status_code,
        headers: merge_headers(&rule.headers),
        body,
        delay_ms: rule.delay,
    })
}

/// Default JSON content type, overridden (case-insensitively) by rule headers.
fn merge_headers(extra: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
    for (name, value) in extra {
        headers.retain(|k: &String, _| !k.eq_ignore_ascii_case(name));
        headers.insert(name.clone(), value.clone());
    }
    headers
}
