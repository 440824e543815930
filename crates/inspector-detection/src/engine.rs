//! Rule compilation and application (spec §4.6).
//!
//! Grounded on the spec's own "Regex rule dispatch → compiled-table cache"
//! redesign note (§9): a `ruleId → compiled regex` map invalidated on rule
//! edits, iterated only over the enabled subset — the same shape
//! `turbomcp-protocol` uses for its schema-validation regex cache
//! (`turbomcp-protocol/src/validation.rs`'s lazily-built pattern table).

use std::collections::HashMap;
use std::sync::RwLock;

use inspector_core::RiskLevel;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::masking::mask;
use crate::rule::{DetectionRule, MatchRecord, RuleMatch, Scope};

const CONTEXT_RADIUS: usize = 50;

/// Compiles and applies [`DetectionRule`]s against serialized parameter and
/// output text.
#[derive(Default)]
pub struct DetectionEngine {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl std::fmt::Debug for DetectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionEngine").finish_non_exhaustive()
    }
}

impl DetectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every enabled rule's pattern+flags into the regex cache.
    /// Compilation failures are logged and that rule is excluded from the
    /// compiled map (but the caller retains it in the rule catalog) —
    /// spec §4.6 "Compilation".
    pub fn recompile(&self, rules: &[DetectionRule]) {
        let mut compiled = HashMap::new();
        for rule in rules.iter().filter(|r| r.enabled) {
            match compile(&rule.pattern, &rule.flags) {
                Ok(regex) => {
                    compiled.insert(rule.id.clone(), regex);
                }
                Err(e) => {
                    tracing::warn!(rule_id = %rule.id, error = %e, "rule pattern failed to compile");
                }
            }
        }
        *self.compiled.write().expect("compiled-rule cache poisoned") = compiled;
    }

    /// Drop the compiled-rule cache so the next `detect_threats` call
    /// recompiles from the caller's current rule set (spec §5:
    /// "DetectionEngine compiles rules lazily on first call after a
    /// mutation").
    pub fn invalidate(&self) {
        self.compiled.write().expect("compiled-rule cache poisoned").clear();
    }

    /// Run every enabled, successfully-compiled rule whose scope matches
    /// `scope_filter` (`None` means "whatever each rule declares") against
    /// `params` and `output`, returning one [`RuleMatch`] per rule that hit.
    pub fn detect_threats(
        &self,
        rules: &[DetectionRule],
        params: &Value,
        output: &Value,
        scope_filter: Option<Scope>,
    ) -> Vec<RuleMatch> {
        if self.compiled.read().expect("compiled-rule cache poisoned").is_empty() && !rules.is_empty() {
            self.recompile(rules);
        }
        let compiled = self.compiled.read().expect("compiled-rule cache poisoned");
        let params_text = canonical_text(params);
        let output_text = canonical_text(output);

        let mut results = Vec::new();
        for rule in rules.iter().filter(|r| r.enabled) {
            let Some(regex) = compiled.get(&rule.id) else {
                continue;
            };
            if !rule.scope.matches_filter(scope_filter) {
                continue;
            }

            // maxMatches is a per-(rule, text) budget (spec §4.6 step 2), so
            // parameters and output each get their own cap rather than
            // sharing one running total.
            let mut matches = Vec::new();
            if rule.scope.includes_parameters() {
                collect_matches(regex, &params_text, rule, &mut matches);
            }
            if rule.scope.includes_output() {
                let mut output_matches = Vec::new();
                collect_matches(regex, &output_text, rule, &mut output_matches);
                matches.extend(output_matches);
            }

            if matches.is_empty() {
                continue;
            }

            let masked_content = if rule.mask_sensitive_data {
                Some(
                    matches
                        .iter()
                        .map(|m| {
                            let subject = m
                                .captured_groups
                                .as_ref()
                                .and_then(|g| g.first())
                                .unwrap_or(&m.full_match);
                            format!("{}: {}", rule.threat_type, mask(subject))
                        })
                        .collect::<Vec<_>>()
                        .join(", "),
                )
            } else {
                None
            };

            results.push(RuleMatch {
                rule: rule.clone(),
                matches,
                severity: rule.risk_level,
                masked_content,
            });
        }
        results
    }
}

fn collect_matches(regex: &Regex, text: &str, rule: &DetectionRule, out: &mut Vec<MatchRecord>) {
    let global = rule.flags.contains('g');
    for m in regex.captures_iter(text) {
        if out.len() >= rule.max_matches {
            break;
        }
        let whole = m.get(0).expect("capture 0 is always present");
        let start = whole.start();
        let end = whole.end();
        let captured_groups: Vec<String> = m
            .iter()
            .skip(1)
            .filter_map(|g| g.map(|g| g.as_str().to_string()))
            .collect();

        out.push(MatchRecord {
            full_match: whole.as_str().to_string(),
            captured_groups: if captured_groups.is_empty() {
                None
            } else {
                Some(captured_groups)
            },
            start_index: start,
            end_index: end,
            context: context_window(text, start, end),
        });

        if !global {
            break;
        }
    }
}

/// `"..." + text[max(0,start-50):min(len,end+50)] + "..."` (spec §4.6).
fn context_window(text: &str, start: usize, end: usize) -> String {
    let window_start = start.saturating_sub(CONTEXT_RADIUS);
    let window_end = (end + CONTEXT_RADIUS).min(text.len());
    let window_start = floor_char_boundary(text, window_start);
    let window_end = ceil_char_boundary(text, window_end);
    format!("...{}...", &text[window_start..window_end])
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn canonical_text(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Compile a rule's `pattern`+`flags` into a [`Regex`]. `g` is handled at
/// match-iteration time, not compile time; `i`/`m`/`s` map onto the regex
/// crate's case-insensitive/multi-line/dot-matches-newline builder knobs.
pub fn compile(pattern: &str, flags: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inspector_core::RiskLevel;
    use serde_json::json;

    fn rule(pattern: &str, flags: &str, max_matches: usize) -> DetectionRule {
        DetectionRule {
            id: "r1".to_string(),
            name: "test rule".to_string(),
            description: "d".to_string(),
            category: crate::rule::RuleCategory::Security,
            pattern: pattern.to_string(),
            flags: flags.to_string(),
            scope: Scope::Both,
            risk_level: RiskLevel::High,
            threat_type: "test".to_string(),
            capture_groups: None,
            mask_sensitive_data: false,
            max_matches,
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
    fn max_matches_caps_collected_records() {
        let engine = DetectionEngine::new();
        let rule = rule(r"\d", "g", 3);
        engine.recompile(&[rule.clone()]);
        let output = json!({"text": "1 2 3 4 5"});
        let result = engine.detect_threats(&[rule], &Value::Null, &output, None);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].matches.len(), 3);
    }

    #[test]
    fn without_global_flag_stops_at_first_match() {
        let engine = DetectionEngine::new();
        let rule = rule(r"\d+", "", 10);
        engine.recompile(&[rule.clone()]);
        let output = json!({"text": "1 2 3"});
        let result = engine.detect_threats(&[rule], &Value::Null, &output, None);
        assert_eq!(result[0].matches.len(), 1);
    }

    #[test]
    fn match_bounds_are_consistent() {
        let engine = DetectionEngine::new();
        let rule = rule(r"password", "g", 10);
        engine.recompile(&[rule.clone()]);
        let output = json!({"text": "password leak"});
        let result = engine.detect_threats(&[rule], &Value::Null, &output, None);
        let m = &result[0].matches[0];
        assert_eq!(m.end_index - m.start_index, m.full_match.len());
        assert!(m.start_index <= m.end_index);
    }

    #[test]
    fn disabled_rule_never_matches() {
        let engine = DetectionEngine::new();
        let mut r = rule("password", "g", 10);
        r.enabled = false;
        engine.recompile(&[r.clone()]);
        let output = json!({"text": "password=hunter2"});
        let result = engine.detect_threats(&[r], &Value::Null, &output, None);
        assert!(result.is_empty());
    }

    #[test]
    fn password_rule_captures_and_masks() {
        let engine = DetectionEngine::new();
        let mut r = rule(r#"(?:password)\s*[:=]\s*["']?([^\s"']{4,})["']?"#, "g", 10);
        r.mask_sensitive_data = true;
        r.risk_level = RiskLevel::Critical;
        engine.recompile(&[r.clone()]);
        let params = json!({"q": "password=hunter2"});
        let output = json!({"text": "ok"});
        let result = engine.detect_threats(&[r], &params, &output, None);
        assert_eq!(result.len(), 1);
        let m = &result[0].matches[0];
        assert_eq!(m.captured_groups.as_ref().unwrap()[0], "hunter2");
        assert_eq!(result[0].masked_content.as_deref(), Some("test: hu***r2"));
        assert_eq!(result[0].severity, RiskLevel::Critical);
    }

    #[test]
    fn scope_restricts_which_text_is_scanned() {
        let engine = DetectionEngine::new();
        let mut r = rule("secret", "g", 10);
        r.scope = Scope::Output;
        engine.recompile(&[r.clone()]);
        let params = json!({"q": "secret"});
        let output = json!({"text": "nothing"});
        let result = engine.detect_threats(&[r], &params, &output, None);
        assert!(result.is_empty());
    }

    #[test]
    fn max_matches_budget_applies_independently_to_params_and_output() {
        // maxMatches caps matches per (rule, text), not per rule overall:
        // a scope=both rule hitting 3 times in params and 3 times in output
        // with maxMatches=3 must return 6 records, not 3.
        let engine = DetectionEngine::new();
        let rule = rule(r"\d", "g", 3);
        engine.recompile(&[rule.clone()]);
        let params = json!({"text": "1 2 3 4 5"});
        let output = json!({"text": "6 7 8 9"});
        let result = engine.detect_threats(&[rule], &params, &output, None);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].matches.len(), 6);
    }
}
