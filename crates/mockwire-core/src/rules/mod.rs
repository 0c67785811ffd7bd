//! Mock rule model and the pure matching functions over it.

pub mod model;
pub mod pattern;
pub mod select;

pub use model::{BodyKind, MockOutcome, MockRule, Project, SyntheticResponse};
pub use pattern::{match_domain, match_path, DomainPattern, PathPattern, SchemeRule};
pub use select::{
    project_applies, project_applies_with, rule_matches, rule_matches_with, select_rule,
    select_rule_with, MatchContext, Patterns, Uncompiled,
};
