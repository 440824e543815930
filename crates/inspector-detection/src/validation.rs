//! Rule validation: field presence, pattern compilability, and the
//! "pattern too broad" probe corpus (spec §4.6 "Rule management").

use crate::engine::compile;
use crate::rule::DetectionRule;
use inspector_core::{Error, Result};

/// Standard probe corpus: a pattern matching every one of these is almost
/// certainly too broad to be a useful rule.
const PROBE_CORPUS: &[&str] = &[
    "test string",
    "password=secret123",
    "api_key=abcd1234567890",
    "rm -rf /",
    "<script>alert(\"xss\")</script>",
    "'; DROP TABLE users; --",
];

/// Validate a candidate rule's required fields and pattern compilability.
/// Returns `Ok(warnings)` on success (possibly empty), `Err` if the rule
/// cannot be installed at all.
pub fn validate(rule: &DetectionRule) -> Result<Vec<String>> {
    if rule.name.trim().is_empty() {
        return Err(Error::Validation("rule name must not be empty".to_string()));
    }
    if rule.pattern.trim().is_empty() {
        return Err(Error::Validation("rule pattern must not be empty".to_string()));
    }
    if rule.threat_type.trim().is_empty() {
        return Err(Error::Validation("rule threatType must not be empty".to_string()));
    }

    let compiled = compile(&rule.pattern, &rule.flags)
        .map_err(|e| Error::Validation(format!("pattern failed to compile: {e}")))?;

    let mut warnings = Vec::new();
    if PROBE_CORPUS.iter().all(|s| compiled.is_match(s)) {
        warnings.push("pattern too broad: matches every entry in the standard probe corpus".to_string());
    }
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleCategory, Scope};
    use chrono::Utc;
    use inspector_core::RiskLevel;

    fn base_rule(pattern: &str) -> DetectionRule {
        DetectionRule {
            id: "r".to_string(),
            name: "name".to_string(),
            description: "d".to_string(),
            category: RuleCategory::Custom,
            pattern: pattern.to_string(),
            flags: String::new(),
            scope: Scope::Both,
            risk_level: RiskLevel::Medium,
            threat_type: "t".to_string(),
            capture_groups: None,
            mask_sensitive_data: false,
            max_matches: 10,
            enabled: true,
            is_builtin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            tags: None,
            recommendation: None,
            remediation: None,
            references: None,
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut r = base_rule("x");
        r.name.clear();
        assert!(validate(&r).is_err());
    }

    #[test]
    fn uncompilable_pattern_is_rejected() {
        let r = base_rule("(unterminated");
        assert!(validate(&r).is_err());
    }

    #[test]
    fn catch_all_pattern_warns_too_broad() {
        let r = base_rule(".*");
        let warnings = validate(&r).unwrap();
        assert!(warnings.iter().any(|w| w.contains("too broad")));
    }

    #[test]
    fn specific_pattern_has_no_warnings() {
        let r = base_rule(r"password\s*=\s*\S+");
        let warnings = validate(&r).unwrap();
        assert!(warnings.is_empty());
    }
}
