//! The passive-monitoring finding shape (spec §3 "DetectionResult").

use chrono::{DateTime, Utc};
use inspector_core::{ArtifactKind, RiskLevel};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One aggregated detection finding for a single observed invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: ArtifactKind,
    #[serde(rename = "targetName")]
    pub target_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub parameters: Value,
    pub result: Value,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
    pub threats: Vec<String>,
    #[serde(rename = "sensitiveDataLeaks")]
    pub sensitive_data_leaks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}
