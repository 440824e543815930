//! The builtin rule corpus shipped at startup (SPEC_FULL §4.6): ≥10 rules
//! spanning every [`RuleCategory`], covering password/secret leakage, API
//! keys, command injection, path traversal, SQL injection, PII, and
//! excessive payload size, plus one `custom`-category example used in
//! tests and as a template for user-authored rules.

use chrono::Utc;
use inspector_core::RiskLevel;

use crate::rule::{DetectionRule, RuleCategory, Scope};

fn rule(
    id: &str,
    name: &str,
    description: &str,
    category: RuleCategory,
    pattern: &str,
    flags: &str,
    scope: Scope,
    risk_level: RiskLevel,
    threat_type: &str,
    mask_sensitive_data: bool,
    recommendation: &str,
) -> DetectionRule {
    let now = Utc::now();
    DetectionRule {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        pattern: pattern.to_string(),
        flags: flags.to_string(),
        scope,
        risk_level,
        threat_type: threat_type.to_string(),
        capture_groups: None,
        mask_sensitive_data,
        max_matches: crate::rule::DEFAULT_MAX_MATCHES,
        enabled: true,
        is_builtin: true,
        created_at: now,
        updated_at: now,
        tags: None,
        recommendation: Some(recommendation.to_string()),
        remediation: None,
        references: None,
    }
}

/// Construct the builtin rule corpus. Stable `id`s so rule references
/// (tags, test fixtures) survive across runs.
pub fn builtin_rules() -> Vec<DetectionRule> {
    vec![
        rule(
            "builtin-password-leak",
            "Password in plaintext",
            "Detects password values embedded in tool parameters or output",
            RuleCategory::Security,
            r#"(?:password)\s*[:=]\s*["']?([^\s"']{4,})["']?"#,
            "gi",
            Scope::Both,
            RiskLevel::Critical,
            "password_leak",
            true,
            "Never echo credentials back through tool parameters or responses.",
        ),
        rule(
            "builtin-api-key",
            "API key exposure",
            "Detects API-key-shaped tokens in parameters or output",
            RuleCategory::Security,
            r#"(?:api[_-]?key)\s*[:=]\s*["']?([A-Za-z0-9_\-]{16,})["']?"#,
            "gi",
            Scope::Both,
            RiskLevel::Critical,
            "api_key_exposure",
            true,
            "Rotate any exposed key and scrub it from logs and responses.",
        ),
        rule(
            "builtin-command-injection",
            "Shell command injection marker",
            "Detects common destructive shell command patterns",
            RuleCategory::Security,
            r"rm\s+-rf\s+/|;\s*rm\s+-rf|`.*`|\$\(.*\)",
            "g",
            Scope::Both,
            RiskLevel::Critical,
            "command_injection",
            false,
            "Sanitize or reject shell metacharacters before execution.",
        ),
        rule(
            "builtin-path-traversal",
            "Path traversal marker",
            "Detects `../` sequences indicating directory traversal attempts",
            RuleCategory::Security,
            r"(?:\.\./){2,}|\.\.\\{2,}",
            "g",
            Scope::Both,
            RiskLevel::High,
            "path_traversal",
            false,
            "Reject relative paths that escape the intended root directory.",
        ),
        rule(
            "builtin-sql-injection",
            "SQL injection marker",
            "Detects common SQL injection payload shapes",
            RuleCategory::Security,
            r"(?i)(?:'\s*;\s*drop\s+table|union\s+select|or\s+1\s*=\s*1|--\s*$)",
            "gm",
            Scope::Both,
            RiskLevel::Critical,
            "sql_injection",
            false,
            "Use parameterized queries; never interpolate user input into SQL.",
        ),
        rule(
            "builtin-xss-script-tag",
            "Script tag injection",
            "Detects `<script>` tags indicating stored/reflected XSS payloads",
            RuleCategory::Security,
            r"(?i)<script[^>]*>.*?</script>",
            "gi",
            Scope::Both,
            RiskLevel::High,
            "xss_injection",
            false,
            "Escape or strip HTML before rendering tool output.",
        ),
        rule(
            "builtin-email-pii",
            "Email address",
            "Detects email addresses, a common PII leakage vector",
            RuleCategory::Privacy,
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
            "g",
            Scope::Both,
            RiskLevel::Medium,
            "pii_email",
            true,
            "Mask or redact email addresses before logging or displaying output.",
        ),
        rule(
            "builtin-ssn-pii",
            "US Social Security Number shape",
            "Detects strings matching the NNN-NN-NNNN SSN shape",
            RuleCategory::Privacy,
            r"\b\d{3}-\d{2}-\d{4}\b",
            "g",
            Scope::Both,
            RiskLevel::High,
            "pii_ssn",
            true,
            "Treat SSN-shaped values as regulated PII; do not log or echo them.",
        ),
        rule(
            "builtin-credit-card",
            "Credit card number shape",
            "Detects strings matching common 16-digit card-number groupings",
            RuleCategory::Compliance,
            r"\b(?:\d[ -]?){13,16}\b",
            "g",
            Scope::Both,
            RiskLevel::High,
            "pci_card_number",
            true,
            "PCI-DSS scope: never persist or echo full card numbers.",
        ),
        rule(
            "builtin-large-payload",
            "Excessive response payload size",
            "Flags output text beyond a size threshold that may indicate a runaway or abusive response",
            RuleCategory::Performance,
            r"^.{10000,}$",
            "s",
            Scope::Output,
            RiskLevel::Low,
            "oversized_payload",
            false,
            "Paginate or truncate large tool responses.",
        ),
        rule(
            "builtin-null-like-value",
            "Placeholder/null-like value",
            "Flags values that look like unresolved template placeholders",
            RuleCategory::DataQuality,
            r"\b(?:undefined|NaN|\[object Object\])\b",
            "g",
            Scope::Output,
            RiskLevel::Low,
            "placeholder_value",
            false,
            "Investigate unresolved template placeholders in tool output.",
        ),
        rule(
            "builtin-custom-example",
            "Custom rule example",
            "A template custom rule retained for tests and as an authoring example",
            RuleCategory::Custom,
            r"TODO|FIXME",
            "gi",
            Scope::Output,
            RiskLevel::Low,
            "leftover_marker",
            false,
            "Not a security finding by itself; useful as a custom-rule starting point.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_has_at_least_ten_rules() {
        assert!(builtin_rules().len() >= 10);
    }

    #[test]
    fn every_category_is_represented() {
        let rules = builtin_rules();
        for category in [
            RuleCategory::Security,
            RuleCategory::Privacy,
            RuleCategory::Compliance,
            RuleCategory::Performance,
            RuleCategory::DataQuality,
            RuleCategory::Custom,
        ] {
            assert!(
                rules.iter().any(|r| r.category == category),
                "missing builtin rule for category {category:?}"
            );
        }
    }

    #[test]
    fn all_builtin_rules_compile() {
        for rule in builtin_rules() {
            crate::engine::compile(&rule.pattern, &rule.flags)
                .unwrap_or_else(|e| panic!("{} failed to compile: {e}", rule.id));
        }
    }

    #[test]
    fn ids_are_unique() {
        let rules = builtin_rules();
        let mut ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), rules.len());
    }
}
