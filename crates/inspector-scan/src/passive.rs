//! Opportunistic detection over live traffic (spec §5 "Passive monitor").
//!
//! Implements `inspector_protocol::InvocationObserver` so `ProtocolClient`
//! can notify it without depending on this crate — the same inversion the
//! teacher uses between `turbomcp-client`'s dispatcher and its pluggable
//! `Middleware` stack (`turbomcp-client/src/middleware/mod.rs`): the lower
//! layer defines the trait, the upper layer implements it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use inspector_core::{max_risk_level, ArtifactKind, RiskLevel};
use inspector_detection::{DetectionEngine, RuleCatalog};
use inspector_protocol::InvocationObserver;
use serde_json::Value;
use uuid::Uuid;

use crate::detection_result::DetectionResult;

/// Ring-buffer capacity for retained passive findings (spec §5: "at most
/// 100 most-recent results are retained").
pub const MAX_RESULTS: usize = 100;

type Listener = Arc<dyn Fn(&DetectionResult) + Send + Sync>;

/// Runs the detection engine over every successful invocation the
/// connected client observes, suppressing low-risk noise and retaining a
/// bounded history of the rest.
pub struct PassiveMonitor {
    engine: Arc<DetectionEngine>,
    rule_catalog: Arc<RuleCatalog>,
    enabled: AtomicBool,
    results: RwLock<VecDeque<DetectionResult>>,
    listeners: RwLock<Vec<Listener>>,
}

impl std::fmt::Debug for PassiveMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassiveMonitor").finish_non_exhaustive()
    }
}

impl PassiveMonitor {
    pub fn new(engine: Arc<DetectionEngine>, rule_catalog: Arc<RuleCatalog>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            rule_catalog,
            enabled: AtomicBool::new(true),
            results: RwLock::new(VecDeque::with_capacity(MAX_RESULTS)),
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Register a callback invoked with every newly retained result.
    pub fn on_result(&self, listener: Listener) {
        self.listeners.write().expect("passive monitor lock poisoned").push(listener);
    }

    /// Most-recent-first snapshot of retained findings.
    pub fn results(&self) -> Vec<DetectionResult> {
        self.results.read().expect("passive monitor lock poisoned").iter().cloned().collect()
    }

    /// Drop all retained findings, e.g. on a new connection attempt.
    pub fn clear(&self) {
        self.results.write().expect("passive monitor lock poisoned").clear();
    }

    fn publish(&self, result: DetectionResult) {
        {
            let mut results = self.results.write().expect("passive monitor lock poisoned");
            if results.len() >= MAX_RESULTS {
                results.pop_back();
            }
            results.push_front(result.clone());
        }
        for listener in self.listeners.read().expect("passive monitor lock poisoned").iter() {
            listener(&result);
        }
    }
}

#[async_trait]
impl InvocationObserver for PassiveMonitor {
    async fn observe(
        &self,
        kind: ArtifactKind,
        target_name: &str,
        params: &Value,
        result: &Value,
        uri: Option<&str>,
    ) {
        if !self.is_enabled() {
            return;
        }

        let rules = self.rule_catalog.rules();
        let rule_matches = self.engine.detect_threats(&rules, params, result, None);
        if rule_matches.is_empty() {
            return;
        }

        let risk_level = max_risk_level(rule_matches.iter().map(|m| m.severity)).unwrap_or(RiskLevel::Low);
        // Noise suppression: low-risk matches alone are not worth surfacing
        // (spec §5: "passive findings below Medium are discarded").
        if risk_level == RiskLevel::Low {
            return;
        }

        let mut threats = Vec::new();
        let mut sensitive_data_leaks = Vec::new();
        let mut recommendation = None;
        for rule_match in &rule_matches {
            for m in &rule_match.matches {
                threats.push(format!(
                    "matched \"{}\" (pos {}\u{2013}{})",
                    truncate(&m.full_match, 100),
                    m.start_index,
                    m.end_index
                ));
            }
            if let Some(masked) = &rule_match.masked_content {
                sensitive_data_leaks.push(masked.clone());
            }
            if recommendation.is_none() {
                recommendation = rule_match.rule.recommendation.clone();
            }
        }

        self.publish(DetectionResult {
            id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            kind,
            target_name: target_name.to_string(),
            uri: uri.map(str::to_string),
            parameters: params.clone(),
            result: result.clone(),
            risk_level,
            threats,
            sensitive_data_leaks,
            recommendation,
        });
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inspector_core::{MemoryStorage, RiskLevel};
    use inspector_detection::{DetectionRule, RuleCategory, Scope};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn password_rule() -> DetectionRule {
        let now = Utc::now();
        DetectionRule {
            id: "custom-password".to_string(),
            name: "password".to_string(),
            description: "d".to_string(),
            category: RuleCategory::Security,
            pattern: r#"password\s*[:=]\s*["']?([^\s"']{4,})["']?"#.to_string(),
            flags: "gi".to_string(),
            scope: Scope::Both,
            risk_level: RiskLevel::High,
            threat_type: "password_leak".to_string(),
            capture_groups: None,
            mask_sensitive_data: true,
            max_matches: 10,
            enabled: true,
            is_builtin: false,
            created_at: now,
            updated_at: now,
            tags: None,
            recommendation: Some("rotate the credential".to_string()),
            remediation: None,
            references: None,
        }
    }

    fn monitor_with(rule: DetectionRule) -> Arc<PassiveMonitor> {
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(DetectionEngine::new());
        let catalog = Arc::new(RuleCatalog::load(storage, engine.clone()));
        catalog.add_custom(rule).unwrap();
        PassiveMonitor::new(engine, catalog)
    }

    #[tokio::test]
    async fn observe_discards_when_disabled() {
        let monitor = monitor_with(password_rule());
        monitor.set_enabled(false);
        monitor
            .observe(
                ArtifactKind::Tool,
                "t",
                &json!({"q": "password=hunter2"}),
                &Value::Null,
                None,
            )
            .await;
        assert!(monitor.results().is_empty());
    }

    #[tokio::test]
    async fn observe_retains_and_publishes_high_risk_finding() {
        let monitor = monitor_with(password_rule());
        let notified = Arc::new(AtomicUsize::new(0));
        let notified2 = notified.clone();
        monitor.on_result(Arc::new(move |_| {
            notified2.fetch_add(1, Ordering::SeqCst);
        }));

        monitor
            .observe(
                ArtifactKind::Tool,
                "login",
                &json!({"q": "password=hunter2"}),
                &Value::Null,
                None,
            )
            .await;

        let results = monitor.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].risk_level, RiskLevel::High);
        assert_eq!(results[0].target_name, "login");
        assert!(!results[0].sensitive_data_leaks.is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ring_buffer_caps_at_max_results() {
        let monitor = monitor_with(password_rule());
        for i in 0..MAX_RESULTS + 5 {
            monitor
                .observe(
                    ArtifactKind::Tool,
                    &format!("t{i}"),
                    &json!({"q": "password=hunter2"}),
                    &Value::Null,
                    None,
                )
                .await;
        }
        assert_eq!(monitor.results().len(), MAX_RESULTS);
    }
}
