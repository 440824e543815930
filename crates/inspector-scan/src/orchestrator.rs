//! The active scan pipeline (spec §6): static analysis, optional
//! LLM-assisted risk assessment and test-case synthesis, test execution,
//! and report assembly, all phased and logged.
//!
//! The phased, structured-logging pipeline is grounded on
//! `turbomcp-client`'s `SessionManager::start_health_monitoring`
//! (`turbomcp-client/src/client/manager.rs`), which advances a connection
//! through named states (`Healthy`/`Degraded`/`Unhealthy`) emitting a
//! `tracing` event at each transition; cancellation here generalizes that
//! module's `stop_health_monitoring`/`Drop`-triggered `JoinHandle::abort`
//! into an explicit `tokio_util::sync::CancellationToken` the caller can
//! fire mid-scan, since the spec requires cooperative cancellation at
//! phase and per-request boundaries rather than only at task teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use inspector_core::{max_risk_level, Error, Result, RiskLevel};
use inspector_detection::{DetectionEngine, RuleCatalog, RuleMatch};
use inspector_protocol::{ArtifactCatalog, ProtocolClient};
use inspector_transport::Transport;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::llm::Llm;
use crate::report::{
    summarize, LogEntryType, PromptScanResult, ResourceScanResult, ScanLogEntry, ScanPhase,
    ScanReport, TestCase, TestCategory, TestOutcome, TestResult, ToolScanResult,
};

/// Default cap on synthesized test cases per artifact (spec §6 "Test
/// generation is bounded per artifact to keep scan duration predictable").
pub const DEFAULT_MAX_TEST_CASES: usize = 5;

/// A synthesized test case as an LLM response is expected to shape it,
/// before an `id` is assigned.
#[derive(Debug, Deserialize)]
struct TestCaseDraft {
    description: String,
    category: TestCategory,
    arguments: Value,
}

struct PartialResult {
    key: String,
    uri: Option<String>,
    static_matches: Vec<RuleMatch>,
    llm_assessment: Option<Value>,
    test_cases: Vec<TestCase>,
    test_results: Vec<TestResult>,
}

/// Orchestrates one active scan of a connected, initialized MCP server.
pub struct ScanOrchestrator<T: Transport> {
    protocol: Arc<ProtocolClient<T>>,
    catalog: Arc<ArtifactCatalog>,
    engine: Arc<DetectionEngine>,
    rule_catalog: Arc<RuleCatalog>,
    llm: Arc<dyn Llm>,
    max_test_cases: usize,
    busy: AtomicBool,
}

impl<T: Transport> std::fmt::Debug for ScanOrchestrator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator").finish_non_exhaustive()
    }
}

impl<T: Transport + 'static> ScanOrchestrator<T> {
    pub fn new(
        protocol: Arc<ProtocolClient<T>>,
        catalog: Arc<ArtifactCatalog>,
        engine: Arc<DetectionEngine>,
        rule_catalog: Arc<RuleCatalog>,
        llm: Arc<dyn Llm>,
    ) -> Arc<Self> {
        Arc::new(Self {
            protocol,
            catalog,
            engine,
            rule_catalog,
            llm,
            max_test_cases: DEFAULT_MAX_TEST_CASES,
            busy: AtomicBool::new(false),
        })
    }

    /// Run one active scan, emitting structured log entries to `log_tx` as
    /// phases progress, and return the assembled report. Concurrent scans
    /// on the same orchestrator are rejected with [`Error::Busy`] (spec
    /// §6: "no more than one active scan per connection at a time").
    pub async fn run(
        self: &Arc<Self>,
        cancel: CancellationToken,
        log_tx: Sender<ScanLogEntry>,
    ) -> Result<ScanReport> {
        if self.busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(Error::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        self.log(&log_tx, ScanPhase::Init, LogEntryType::Info, "Scan started", "Beginning security scan").await;

        let rules = self.rule_catalog.rules();
        let tools = self.catalog.tools().await;
        let prompts = self.catalog.prompts().await;
        let resources = self.catalog.resources().await;
        let templates = self.catalog.resource_templates().await;

        let mut tool_partials: Vec<PartialResult> = Vec::new();
        for tool in &tools {
            if cancel.is_cancelled() {
                break;
            }
            let subject = json!({
                "name": tool.tool.name,
                "description": tool.tool.description,
                "schema": tool.tool.input_schema,
            });
            let static_matches = self.engine.detect_threats(&rules, &subject, &Value::Null, None);
            let llm_assessment = self.assess(&log_tx, ScanPhase::ToolAnalysis, &tool.tool.name, &subject).await;
            self.log(
                &log_tx,
                ScanPhase::ToolAnalysis,
                LogEntryType::Step,
                "Tool analyzed",
                &format!("Statically analyzed tool \"{}\"", tool.tool.name),
            )
            .await;
            tool_partials.push(PartialResult {
                key: tool.tool.name.clone(),
                uri: None,
                static_matches,
                llm_assessment,
                test_cases: Vec::new(),
                test_results: Vec::new(),
            });
        }

        let mut prompt_partials: Vec<PartialResult> = Vec::new();
        if !cancel.is_cancelled() {
            for prompt in &prompts {
                if cancel.is_cancelled() {
                    break;
                }
                let subject = json!({
                    "name": prompt.prompt.name,
                    "description": prompt.prompt.description,
                    "arguments": prompt.prompt.arguments,
                });
                let static_matches = self.engine.detect_threats(&rules, &subject, &Value::Null, None);
                let llm_assessment =
                    self.assess(&log_tx, ScanPhase::PromptAnalysis, &prompt.prompt.name, &subject).await;
                self.log(
                    &log_tx,
                    ScanPhase::PromptAnalysis,
                    LogEntryType::Step,
                    "Prompt analyzed",
                    &format!("Statically analyzed prompt \"{}\"", prompt.prompt.name),
                )
                .await;
                prompt_partials.push(PartialResult {
                    key: prompt.prompt.name.clone(),
                    uri: None,
                    static_matches,
                    llm_assessment,
                    test_cases: Vec::new(),
                    test_results: Vec::new(),
                });
            }
        }

        let mut resource_partials: Vec<PartialResult> = Vec::new();
        if !cancel.is_cancelled() {
            for resource in &resources {
                if cancel.is_cancelled() {
                    break;
                }
                let subject = json!({
                    "uri": resource.resource.uri,
                    "name": resource.resource.name,
                    "description": resource.resource.description,
                });
                let static_matches = self.engine.detect_threats(&rules, &subject, &Value::Null, None);
                self.log(
                    &log_tx,
                    ScanPhase::ResourceAnalysis,
                    LogEntryType::Step,
                    "Resource analyzed",
                    &format!("Statically analyzed resource \"{}\"", resource.resource.uri),
                )
                .await;
                resource_partials.push(PartialResult {
                    key: resource.resource.uri.clone(),
                    uri: Some(resource.resource.uri.clone()),
                    static_matches,
                    llm_assessment: None,
                    test_cases: Vec::new(),
                    test_results: Vec::new(),
                });
            }
            for template in &templates {
                if cancel.is_cancelled() {
                    break;
                }
                let key = template.template.uri_or_template().to_string();
                let subject = json!({
                    "uriTemplate": template.template.uri_template,
                    "name": template.template.name,
                    "description": template.template.description,
                });
                let static_matches = self.engine.detect_threats(&rules, &subject, &Value::Null, None);
                self.log(
                    &log_tx,
                    ScanPhase::ResourceAnalysis,
                    LogEntryType::Step,
                    "Resource template analyzed",
                    &format!("Statically analyzed resource template \"{key}\""),
                )
                .await;
                resource_partials.push(PartialResult {
                    key: key.clone(),
                    uri: Some(key),
                    static_matches,
                    llm_assessment: None,
                    test_cases: Vec::new(),
                    test_results: Vec::new(),
                });
            }
        }

        if !cancel.is_cancelled() && self.llm.is_available() {
            self.log(
                &log_tx,
                ScanPhase::TestGeneration,
                LogEntryType::Info,
                "Synthesizing test cases",
                "Asking the LLM collaborator for adversarial test cases",
            )
            .await;
            for (partial, tool) in tool_partials.iter_mut().zip(tools.iter()) {
                if cancel.is_cancelled() {
                    break;
                }
                if tool.analysis.requires_synthesis {
                    partial.test_cases = self.synthesize(&tool.tool.name, &json!(tool.tool)).await;
                }
            }
            for (partial, prompt) in prompt_partials.iter_mut().zip(prompts.iter()) {
                if cancel.is_cancelled() {
                    break;
                }
                if prompt.analysis.requires_synthesis {
                    partial.test_cases = self.synthesize(&prompt.prompt.name, &json!(prompt.prompt)).await;
                }
            }
            for (partial, template) in resource_partials
                .iter_mut()
                .skip(resources.len())
                .zip(templates.iter())
            {
                if cancel.is_cancelled() {
                    break;
                }
                partial.test_cases = self.synthesize(&partial.key, &json!(template.template)).await;
            }
        } else if !cancel.is_cancelled() {
            self.log(
                &log_tx,
                ScanPhase::TestGeneration,
                LogEntryType::Warning,
                "Skipping test synthesis",
                "No LLM collaborator configured; scan is static-only",
            )
            .await;
        }

        if !cancel.is_cancelled() {
            for partial in &mut tool_partials {
                if cancel.is_cancelled() {
                    break;
                }
                for case in partial.test_cases.clone() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let result = self.execute_tool_case(&rules, &partial.key, case).await;
                    partial.test_results.push(result);
                }
            }
            for partial in &mut prompt_partials {
                if cancel.is_cancelled() {
                    break;
                }
                for case in partial.test_cases.clone() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let result = self.execute_prompt_case(&rules, &partial.key, case).await;
                    partial.test_results.push(result);
                }
            }
            for partial in resource_partials.iter_mut().skip(resources.len()) {
                if cancel.is_cancelled() {
                    break;
                }
                for case in partial.test_cases.clone() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let result = self.execute_resource_case(&rules, case).await;
                    partial.test_results.push(result);
                }
            }
            self.log(
                &log_tx,
                ScanPhase::TestExecution,
                LogEntryType::Step,
                "Test execution complete",
                "Finished executing synthesized test cases",
            )
            .await;
        }

        if cancel.is_cancelled() {
            self.log(
                &log_tx,
                ScanPhase::Evaluation,
                LogEntryType::Warning,
                "Scan cancelled",
                "Cancellation requested; reporting partial results",
            )
            .await;
        }

        self.log(
            &log_tx,
            ScanPhase::Evaluation,
            LogEntryType::Info,
            "Evaluating results",
            "Classifying findings and computing overall risk",
        )
        .await;

        let tool_results: Vec<ToolScanResult> = tool_partials.into_iter().map(finish_tool).collect();
        let prompt_results: Vec<PromptScanResult> = prompt_partials.into_iter().map(finish_prompt).collect();
        let resource_results: Vec<ResourceScanResult> =
            resource_partials.into_iter().map(finish_resource).collect();

        let (overall_risk, summary) = summarize(&tool_results, &prompt_results, &resource_results);

        self.log(
            &log_tx,
            ScanPhase::Summary,
            LogEntryType::Success,
            "Scan complete",
            &format!("Overall risk: {overall_risk}"),
        )
        .await;

        Ok(ScanReport {
            overall_risk,
            tool_results,
            prompt_results,
            resource_results,
            summary,
        })
    }

    async fn assess(
        &self,
        log_tx: &Sender<ScanLogEntry>,
        phase: ScanPhase,
        name: &str,
        subject: &Value,
    ) -> Option<Value> {
        if !self.llm.is_available() {
            return None;
        }
        let prompt = format!(
            "Assess the security risk of this MCP artifact and respond with a JSON object \
             describing risks, potential impact, and mitigations:\n{subject}"
        );
        match self.llm.generate(&prompt, None).await {
            Ok(assessment) => Some(assessment),
            Err(e) => {
                self.log(
                    log_tx,
                    phase,
                    LogEntryType::Warning,
                    "LLM assessment unavailable",
                    &format!("Falling back to static-only analysis for \"{name}\": {e}"),
                )
                .await;
                None
            }
        }
    }

    async fn synthesize(&self, name: &str, subject: &Value) -> Vec<TestCase> {
        let prompt = format!(
            "Generate up to {} adversarial test cases (injection, traversal, \
             privilege_escalation, or boundary) for this MCP artifact, as a JSON array of \
             {{description, category, arguments}} objects:\n{subject}",
            self.max_test_cases
        );
        let Ok(response) = self.llm.generate(&prompt, None).await else {
            return Vec::new();
        };
        let Ok(drafts) = serde_json::from_value::<Vec<TestCaseDraft>>(response) else {
            tracing::warn!(target = name, "LLM test synthesis returned an unparseable response");
            return Vec::new();
        };
        drafts
            .into_iter()
            .take(self.max_test_cases)
            .map(|draft| TestCase {
                id: Uuid::new_v4().to_string(),
                description: draft.description,
                category: draft.category,
                arguments: draft.arguments,
            })
            .collect()
    }

    async fn execute_tool_case(
        &self,
        rules: &[inspector_detection::DetectionRule],
        tool_name: &str,
        case: TestCase,
    ) -> TestResult {
        match self.protocol.call_tool(tool_name, case.arguments.clone()).await {
            Ok(response) => {
                let matches = self.engine.detect_threats(rules, &case.arguments, &response, None);
                let outcome = classify(&matches);
                TestResult { test_case: case, outcome, response: Some(response), error: None, matches }
            }
            Err(e) => TestResult {
                test_case: case,
                outcome: TestOutcome::Failed,
                response: None,
                error: Some(e.to_string()),
                matches: Vec::new(),
            },
        }
    }

    async fn execute_prompt_case(
        &self,
        rules: &[inspector_detection::DetectionRule],
        prompt_name: &str,
        case: TestCase,
    ) -> TestResult {
        match self.protocol.get_prompt(prompt_name, Some(case.arguments.clone())).await {
            Ok(response) => {
                let matches = self.engine.detect_threats(rules, &case.arguments, &response, None);
                let outcome = classify(&matches);
                TestResult { test_case: case, outcome, response: Some(response), error: None, matches }
            }
            Err(e) => TestResult {
                test_case: case,
                outcome: TestOutcome::Failed,
                response: None,
                error: Some(e.to_string()),
                matches: Vec::new(),
            },
        }
    }

    async fn execute_resource_case(
        &self,
        rules: &[inspector_detection::DetectionRule],
        case: TestCase,
    ) -> TestResult {
        let Some(uri) = case.arguments.get("uri").and_then(Value::as_str) else {
            return TestResult {
                test_case: case,
                outcome: TestOutcome::Failed,
                response: None,
                error: Some("synthesized test case has no \"uri\" argument".to_string()),
                matches: Vec::new(),
            };
        };
        let uri = uri.to_string();
        match self.protocol.read_resource(&uri).await {
            Ok(response) => {
                let matches = self.engine.detect_threats(rules, &case.arguments, &response, None);
                let outcome = classify(&matches);
                TestResult { test_case: case, outcome, response: Some(response), error: None, matches }
            }
            Err(e) => TestResult {
                test_case: case,
                outcome: TestOutcome::Failed,
                response: None,
                error: Some(e.to_string()),
                matches: Vec::new(),
            },
        }
    }

    async fn log(&self, tx: &Sender<ScanLogEntry>, phase: ScanPhase, log_type: LogEntryType, title: &str, message: &str) {
        let entry = ScanLogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            log_type,
            phase,
            title: title.to_string(),
            message: message.to_string(),
            details: None,
            progress: None,
            duration: None,
            metadata: None,
        };
        if tx.send(entry).await.is_err() {
            tracing::debug!("scan log receiver dropped; continuing without a listener");
        }
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A `Medium`-or-above match means the probe demonstrated a real weakness;
/// a lower match is a [`TestOutcome::Warning`]; no match at all is a clean
/// pass (spec §6 "Evaluation").
fn classify(matches: &[RuleMatch]) -> TestOutcome {
    match max_risk_level(matches.iter().map(|m| m.severity)) {
        Some(level) if level >= RiskLevel::Medium => TestOutcome::Vulnerable,
        Some(_) => TestOutcome::Warning,
        None => TestOutcome::Passed,
    }
}

fn result_risk(static_matches: &[RuleMatch], test_results: &[TestResult]) -> RiskLevel {
    let levels = static_matches
        .iter()
        .map(|m| m.severity)
        .chain(test_results.iter().flat_map(|t| t.matches.iter().map(|m| m.severity)));
    max_risk_level(levels).unwrap_or(RiskLevel::Low)
}

fn finish_tool(partial: PartialResult) -> ToolScanResult {
    let risk_level = result_risk(&partial.static_matches, &partial.test_results);
    ToolScanResult {
        tool_name: partial.key,
        static_matches: partial.static_matches,
        llm_assessment: partial.llm_assessment,
        test_results: partial.test_results,
        risk_level,
    }
}

fn finish_prompt(partial: PartialResult) -> PromptScanResult {
    let risk_level = result_risk(&partial.static_matches, &partial.test_results);
    PromptScanResult {
        prompt_name: partial.key,
        static_matches: partial.static_matches,
        llm_assessment: partial.llm_assessment,
        test_results: partial.test_results,
        risk_level,
    }
}

fn finish_resource(partial: PartialResult) -> ResourceScanResult {
    let risk_level = result_risk(&partial.static_matches, &partial.test_results);
    ResourceScanResult {
        uri: partial.uri.unwrap_or(partial.key),
        static_matches: partial.static_matches,
        llm_assessment: partial.llm_assessment,
        test_results: partial.test_results,
        risk_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inspector_core::{MemoryStorage, Result as CoreResult};
    use inspector_detection::{DetectionRule, RuleCategory, Scope};
    use inspector_transport::Transport as TransportTrait;
    use inspector_transport::TransportEvent;
    use tokio::sync::mpsc;

    #[derive(Debug)]
    struct NopTransport;

    #[async_trait]
    impl TransportTrait for NopTransport {
        async fn start(&self) -> CoreResult<()> {
            Ok(())
        }
        async fn send(&self, _message: Value) -> CoreResult<()> {
            Ok(())
        }
        async fn receive(&self) -> CoreResult<TransportEvent> {
            std::future::pending().await
        }
        async fn close(&self) -> CoreResult<()> {
            Ok(())
        }
        fn session_id(&self) -> Option<String> {
            None
        }
        fn set_protocol_version(&self, _version: &str) {}
    }

    fn test_rule() -> DetectionRule {
        let now = Utc::now();
        DetectionRule {
            id: "r1".to_string(),
            name: "n".to_string(),
            description: "d".to_string(),
            category: RuleCategory::Security,
            pattern: "danger".to_string(),
            flags: "g".to_string(),
            scope: Scope::Both,
            risk_level: RiskLevel::High,
            threat_type: "danger_marker".to_string(),
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
        }
    }

    fn orchestrator() -> Arc<ScanOrchestrator<NopTransport>> {
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(DetectionEngine::new());
        let rule_catalog = Arc::new(RuleCatalog::load(storage, engine.clone()));
        rule_catalog.add_custom(test_rule()).unwrap();
        let transport = Arc::new(NopTransport);
        let protocol = ProtocolClient::new(transport);
        let catalog = ArtifactCatalog::new();
        ScanOrchestrator::new(protocol, catalog, engine, rule_catalog, Arc::new(crate::llm::NullLlm))
    }

    #[tokio::test]
    async fn empty_catalog_produces_low_risk_empty_report() {
        let orchestrator = orchestrator();
        let (tx, mut rx) = mpsc::channel(32);
        let rx_task = tokio::spawn(async move {
            let mut entries = Vec::new();
            while let Some(e) = rx.recv().await {
                entries.push(e);
            }
            entries
        });
        let report = orchestrator.run(CancellationToken::new(), tx).await.unwrap();
        drop(rx_task);

        assert_eq!(report.overall_risk, RiskLevel::Low);
        assert!(report.tool_results.is_empty());
        assert_eq!(report.summary.total_issues, 0);
    }

    #[tokio::test]
    async fn concurrent_scans_are_rejected_with_busy() {
        let orchestrator = orchestrator();
        orchestrator.busy.store(true, Ordering::SeqCst);
        let (tx, _rx) = mpsc::channel(4);
        let result = orchestrator.run(CancellationToken::new(), tx).await;
        assert!(matches!(result, Err(Error::Busy)));
        orchestrator.busy.store(false, Ordering::SeqCst);
    }

    #[test]
    fn classify_picks_vulnerable_over_warning_over_passed() {
        let high = RuleMatch {
            rule: test_rule(),
            matches: Vec::new(),
            severity: RiskLevel::High,
            masked_content: None,
        };
        let mut low = high.clone();
        low.severity = RiskLevel::Low;

        assert_eq!(classify(&[high]), TestOutcome::Vulnerable);
        assert_eq!(classify(&[low]), TestOutcome::Warning);
        assert_eq!(classify(&[]), TestOutcome::Passed);
    }
}
