//! Passive traffic monitoring and active scan orchestration for the MCP
//! security inspector (spec §5, §6).

mod detection_result;
mod llm;
mod orchestrator;
mod passive;
mod report;

pub use detection_result::DetectionResult;
pub use llm::{Llm, NullLlm};
pub use orchestrator::{ScanOrchestrator, DEFAULT_MAX_TEST_CASES};
pub use passive::{PassiveMonitor, MAX_RESULTS};
pub use report::{
    LogEntryType, PromptScanResult, ResourceScanResult, ScanLogEntry, ScanPhase, ScanReport,
    ScanSummary, TestCase, TestCategory, TestOutcome, TestResult, ToolScanResult,
};
