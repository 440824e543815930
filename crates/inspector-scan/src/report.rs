//! Active-scan result shapes (spec §6 "ScanReport").

use inspector_core::RiskLevel;
use inspector_detection::RuleMatch;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which adversarial pattern a synthesized test case probes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    Injection,
    Traversal,
    PrivilegeEscalation,
    Boundary,
}

/// One synthesized adversarial invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub description: String,
    pub category: TestCategory,
    pub arguments: Value,
}

/// How a test case's execution was classified (spec §6 "Evaluation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    /// No detection-engine hit and no invocation error: the target
    /// withstood the probe.
    Passed,
    /// The invocation itself errored in a way that did not reveal a
    /// detection-engine hit (e.g. transport failure, server-side 500).
    Failed,
    /// A detection-engine match of at least `Medium` severity fired on the
    /// response: the probe succeeded in demonstrating a weakness.
    Vulnerable,
    /// A detection-engine match fired but only at `Low` severity: worth a
    /// human's attention without being a confirmed finding.
    Warning,
}

/// The executed outcome of one [`TestCase`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(rename = "testCase")]
    pub test_case: TestCase,
    pub outcome: TestOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub matches: Vec<RuleMatch>,
}

/// The static analysis, optional LLM assessment, and test execution
/// results for a single tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolScanResult {
    #[serde(rename = "toolName")]
    pub tool_name: String,
    #[serde(rename = "staticMatches")]
    pub static_matches: Vec<RuleMatch>,
    #[serde(rename = "llmAssessment", default, skip_serializing_if = "Option::is_none")]
    pub llm_assessment: Option<Value>,
    #[serde(rename = "testResults")]
    pub test_results: Vec<TestResult>,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
}

/// Same shape as [`ToolScanResult`], keyed by prompt name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptScanResult {
    #[serde(rename = "promptName")]
    pub prompt_name: String,
    #[serde(rename = "staticMatches")]
    pub static_matches: Vec<RuleMatch>,
    #[serde(rename = "llmAssessment", default, skip_serializing_if = "Option::is_none")]
    pub llm_assessment: Option<Value>,
    #[serde(rename = "testResults")]
    pub test_results: Vec<TestResult>,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
}

/// Same shape as [`ToolScanResult`], keyed by resource (or resource
/// template) URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceScanResult {
    pub uri: String,
    #[serde(rename = "staticMatches")]
    pub static_matches: Vec<RuleMatch>,
    #[serde(rename = "llmAssessment", default, skip_serializing_if = "Option::is_none")]
    pub llm_assessment: Option<Value>,
    #[serde(rename = "testResults")]
    pub test_results: Vec<TestResult>,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
}

/// Rolled-up counts across every tool/prompt/resource result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    #[serde(rename = "totalIssues")]
    pub total_issues: usize,
    #[serde(rename = "criticalIssues")]
    pub critical_issues: usize,
    #[serde(rename = "highIssues")]
    pub high_issues: usize,
    #[serde(rename = "mediumIssues")]
    pub medium_issues: usize,
    #[serde(rename = "lowIssues")]
    pub low_issues: usize,
}

/// The full result of one active scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(rename = "overallRisk")]
    pub overall_risk: RiskLevel,
    #[serde(rename = "toolResults")]
    pub tool_results: Vec<ToolScanResult>,
    #[serde(rename = "promptResults")]
    pub prompt_results: Vec<PromptScanResult>,
    #[serde(rename = "resourceResults")]
    pub resource_results: Vec<ResourceScanResult>,
    pub summary: ScanSummary,
}

/// The phases a scan run progresses through in order (spec §6 "Phases").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Init,
    ToolAnalysis,
    PromptAnalysis,
    ResourceAnalysis,
    TestGeneration,
    TestExecution,
    Evaluation,
    Summary,
}

/// The severity of one structured log entry, independent of
/// [`RiskLevel`] (spec §6 "Structured logging").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEntryType {
    Info,
    Success,
    Warning,
    Error,
    Step,
}

/// One structured progress/diagnostic event emitted while a scan runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanLogEntry {
    pub id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "type")]
    pub log_type: LogEntryType,
    pub phase: ScanPhase,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

pub fn summarize(
    tool_results: &[ToolScanResult],
    prompt_results: &[PromptScanResult],
    resource_results: &[ResourceScanResult],
) -> (RiskLevel, ScanSummary) {
    let mut summary = ScanSummary::default();
    let mut levels = Vec::new();

    let mut count = |level: RiskLevel| {
        summary.total_issues += 1;
        match level {
            RiskLevel::Critical => summary.critical_issues += 1,
            RiskLevel::High => summary.high_issues += 1,
            RiskLevel::Medium => summary.medium_issues += 1,
            RiskLevel::Low => summary.low_issues += 1,
        }
    };

    // Findings come from both static analysis and test execution (a
    // vulnerable test case's matches are findings too) — summing only
    // `static_matches` would undercount `totalIssues` relative to the
    // overall risk, which already folds test-derived severities in via
    // each result's `risk_level` (see `result_risk`).
    for r in tool_results {
        levels.push(r.risk_level);
        for m in &r.static_matches {
            count(m.severity);
        }
        for t in &r.test_results {
            for m in &t.matches {
                count(m.severity);
            }
        }
    }
    for r in prompt_results {
        levels.push(r.risk_level);
        for m in &r.static_matches {
            count(m.severity);
        }
        for t in &r.test_results {
            for m in &t.matches {
                count(m.severity);
            }
        }
    }
    for r in resource_results {
        levels.push(r.risk_level);
        for m in &r.static_matches {
            count(m.severity);
        }
        for t in &r.test_results {
            for m in &t.matches {
                count(m.severity);
            }
        }
    }

    let overall = inspector_core::max_risk_level(levels).unwrap_or(RiskLevel::Low);
    (overall, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inspector_detection::{DetectionRule, RuleCategory, Scope};

    fn rule_match(severity: RiskLevel) -> RuleMatch {
        let now = Utc::now();
        RuleMatch {
            rule: DetectionRule {
                id: "r".to_string(),
                name: "n".to_string(),
                description: "d".to_string(),
                category: RuleCategory::Security,
                pattern: "x".to_string(),
                flags: String::new(),
                scope: Scope::Both,
                risk_level: severity,
                threat_type: "t".to_string(),
                capture_groups: None,
                mask_sensitive_data: false,
                max_matches: 10,
                enabled: true,
                is_builtin: false,
                created_at: now,
                updated_at: now,
                tags: None,
                recommendation: None,
                remediation: None,
                references: None,
            },
            matches: Vec::new(),
            severity,
            masked_content: None,
        }
    }

    fn case(category: TestCategory) -> TestCase {
        TestCase {
            id: "c".to_string(),
            description: "d".to_string(),
            category,
            arguments: Value::Null,
        }
    }

    #[test]
    fn summary_counts_include_test_execution_matches_not_just_static() {
        let tool = ToolScanResult {
            tool_name: "echo".to_string(),
            static_matches: vec![rule_match(RiskLevel::Medium)],
            llm_assessment: None,
            test_results: vec![TestResult {
                test_case: case(TestCategory::Injection),
                outcome: TestOutcome::Vulnerable,
                response: None,
                error: None,
                matches: vec![rule_match(RiskLevel::Critical)],
            }],
            risk_level: RiskLevel::Critical,
        };
        let (overall, summary) = summarize(&[tool], &[], &[]);
        assert_eq!(overall, RiskLevel::Critical);
        assert_eq!(summary.total_issues, 2);
        assert_eq!(summary.medium_issues, 1);
        assert_eq!(summary.critical_issues, 1);
    }

    #[test]
    fn empty_results_yield_low_overall_and_zero_summary() {
        let (overall, summary) = summarize(&[], &[], &[]);
        assert_eq!(overall, RiskLevel::Low);
        assert_eq!(summary.total_issues, 0);
    }
}
