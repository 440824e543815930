//! The LLM collaborator interface (spec §6): a pluggable external test-case
//! generator and risk assessor. No specific provider is mandated; this
//! crate ships only the trait and a no-op default, the way the teacher's
//! `RetryPolicy::Never` or `turbomcp-client::llm::providers` ships a
//! registry of provider adapters behind one trait.

use async_trait::async_trait;
use inspector_core::{Error, Result};
use serde_json::Value;

/// `generate(prompt, schema?) -> response`, `isAvailable() -> bool` (spec
/// §6 "LLM collaborator interface").
#[async_trait]
pub trait Llm: Send + Sync {
    /// Generate a response to `prompt`, optionally constrained by a JSON
    /// schema the caller expects the response to conform to.
    async fn generate(&self, prompt: &str, schema: Option<&Value>) -> Result<Value>;

    /// Whether this collaborator is currently usable. The orchestrator
    /// checks this before attempting LLM-assisted assessment or synthesis
    /// and degrades to static-only analysis when `false`.
    fn is_available(&self) -> bool;
}

/// Default `Llm` implementation: always unavailable. Lets `inspector-scan`
/// run (and be tested) standalone, with every scan falling back to
/// static-only analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLlm;

#[async_trait]
impl Llm for NullLlm {
    async fn generate(&self, _prompt: &str, _schema: Option<&Value>) -> Result<Value> {
        Err(Error::Validation("no LLM collaborator configured".to_string()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_llm_is_never_available() {
        let llm = NullLlm;
        assert!(!llm.is_available());
        assert!(llm.generate("anything", None).await.is_err());
    }
}
