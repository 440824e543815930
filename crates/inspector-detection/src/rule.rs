//! Detection rule and match record shapes (spec §3 "DetectionRule" /
//! "RuleMatch").

use chrono::{DateTime, Utc};
use inspector_core::RiskLevel;
use serde::{Deserialize, Serialize};

/// Which category of concern a rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Security,
    Privacy,
    Compliance,
    Performance,
    DataQuality,
    Custom,
}

/// Which text a rule is run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Parameters,
    Output,
    Both,
}

impl Scope {
    pub fn includes_parameters(self) -> bool {
        matches!(self, Self::Parameters | Self::Both)
    }

    pub fn includes_output(self) -> bool {
        matches!(self, Self::Output | Self::Both)
    }

    /// Whether a rule with this scope participates in a scan restricted to
    /// `filter` ("both matches any", spec §4.6).
    pub fn matches_filter(self, filter: Option<Scope>) -> bool {
        match filter {
            None => true,
            Some(Scope::Both) => true,
            Some(f) => self == Scope::Both || self == f,
        }
    }
}

/// Default cap on matches collected per (rule, text) pair.
pub const DEFAULT_MAX_MATCHES: usize = 10;

/// A versioned regex rule in the detection corpus (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: RuleCategory,
    pub pattern: String,
    #[serde(default)]
    pub flags: String,
    pub scope: Scope,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
    #[serde(rename = "threatType")]
    pub threat_type: String,
    #[serde(rename = "captureGroups", default, skip_serializing_if = "Option::is_none")]
    pub capture_groups: Option<Vec<String>>,
    #[serde(rename = "maskSensitiveData", default)]
    pub mask_sensitive_data: bool,
    #[serde(rename = "maxMatches", default = "default_max_matches")]
    pub max_matches: usize,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(rename = "isBuiltin", default)]
    pub is_builtin: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
}

fn default_max_matches() -> usize {
    DEFAULT_MAX_MATCHES
}

fn default_true() -> bool {
    true
}

/// One occurrence of a rule's pattern within scanned text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(rename = "fullMatch")]
    pub full_match: String,
    #[serde(rename = "capturedGroups", default, skip_serializing_if = "Option::is_none")]
    pub captured_groups: Option<Vec<String>>,
    #[serde(rename = "startIndex")]
    pub start_index: usize,
    #[serde(rename = "endIndex")]
    pub end_index: usize,
    pub context: String,
}

/// All occurrences of one rule's pattern within one detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule: DetectionRule,
    pub matches: Vec<MatchRecord>,
    pub severity: RiskLevel,
    #[serde(rename = "maskedContent", default, skip_serializing_if = "Option::is_none")]
    pub masked_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_both_matches_any_filter() {
        assert!(Scope::Both.matches_filter(Some(Scope::Parameters)));
        assert!(Scope::Both.matches_filter(Some(Scope::Output)));
        assert!(Scope::Both.matches_filter(None));
    }

    #[test]
    fn scope_parameters_only_matches_parameters_or_unset_filter() {
        assert!(Scope::Parameters.matches_filter(None));
        assert!(Scope::Parameters.matches_filter(Some(Scope::Parameters)));
        assert!(!Scope::Parameters.matches_filter(Some(Scope::Output)));
    }
}
