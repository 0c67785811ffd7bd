//! Rule matching engine served by the background context.
//!
//! - `store`: data-access collaborator (`RuleStore`) and the in-memory store
//! - `patterns`: compiled path/domain patterns, reused across calls
//! - `script`: body scripts for `script`-kind rules
//! - `synth`: `SyntheticResponse` construction
//! - `service`: `MockEngine`, the `Service` behind the background responder

pub mod patterns;
pub mod script;
pub mod service;
pub mod store;
pub mod synth;

pub use patterns::PatternCache;
pub use script::{RhaiRunner, ScriptRequest, ScriptRunner};
pub use service::MockEngine;
pub use store::{MemoryStore, RuleStore};
pub use synth::synthesize;
