//! Regex rule detection engine and rule catalog (spec §4.6, §4.9).

mod builtin;
mod catalog;
mod engine;
mod masking;
mod rule;
mod validation;

pub use builtin::builtin_rules;
pub use catalog::RuleCatalog;
pub use engine::{compile, DetectionEngine};
pub use masking::mask;
pub use rule::{
    DetectionRule, MatchRecord, RuleCategory, RuleMatch, Scope, DEFAULT_MAX_MATCHES,
};
pub use validation::validate;
