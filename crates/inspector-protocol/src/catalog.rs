//! Artifact enumeration and caching (spec §4.5).
//!
//! Tools are fetched synchronously "to satisfy early callers"; prompts,
//! resources, and resource templates are fetched in parallel afterwards
//! via `tokio::join!`, mirroring `turbomcp-client`'s pattern of an
//! eagerly-populated primary list plus a background-filled secondary set
//! (`turbomcp-client/src/client/operations/*.rs` each owning one artifact
//! kind, called from one composing site).

use std::collections::HashSet;
use std::sync::Arc;

use inspector_core::{
    EnhancedPrompt, EnhancedResource, EnhancedResourceTemplate, EnhancedTool, ParameterAnalysis,
    Prompt, Resource, ResourceTemplate, Result, Tool,
};
use inspector_transport::Transport;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::client::ProtocolClient;

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Enumerated and cached tools/prompts/resources/resource-templates, each
/// paired with its derived [`ParameterAnalysis`].
#[derive(Default)]
pub struct ArtifactCatalog {
    tools: RwLock<Vec<EnhancedTool>>,
    prompts: RwLock<Vec<EnhancedPrompt>>,
    resources: RwLock<Vec<EnhancedResource>>,
    resource_templates: RwLock<Vec<EnhancedResourceTemplate>>,
    listeners: RwLock<Vec<Listener>>,
}

impl std::fmt::Debug for ArtifactCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCatalog").finish_non_exhaustive()
    }
}

impl ArtifactCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a callback invoked once per batch of installed updates
    /// (spec §4.5: "registered listeners notified exactly once per batch").
    pub async fn on_updated(&self, listener: Listener) {
        self.listeners.write().await.push(listener);
    }

    async fn notify_listeners(&self) {
        for listener in self.listeners.read().await.iter() {
            listener();
        }
    }

    /// Populate the catalog from a connected, initialized client: tools
    /// first (synchronously), then prompts/resources/resource-templates
    /// fetched in parallel.
    pub async fn populate<T: Transport + 'static>(
        self: &Arc<Self>,
        client: &ProtocolClient<T>,
    ) -> Result<()> {
        let raw_tools = client.list_tools().await?;
        let tools = dedup_by(raw_tools, |v| v.get("name").and_then(Value::as_str).map(str::to_string))
            .into_iter()
            .filter_map(|v| serde_json::from_value::<Tool>(v).ok())
            .map(|tool| EnhancedTool {
                analysis: ParameterAnalysis::from_tool(&tool),
                tool,
            })
            .collect();
        *self.tools.write().await = tools;
        self.notify_listeners().await;

        let (raw_prompts, raw_resources, raw_templates) = tokio::join!(
            client.list_prompts(),
            client.list_resources(),
            client.list_resource_templates(),
        );

        let prompts = dedup_by(raw_prompts?, |v| v.get("name").and_then(Value::as_str).map(str::to_string))
            .into_iter()
            .filter_map(|v| serde_json::from_value::<Prompt>(v).ok())
            .map(|prompt| EnhancedPrompt {
                analysis: ParameterAnalysis::from_prompt(&prompt),
                prompt,
            })
            .collect();
        *self.prompts.write().await = prompts;

        let resources: Vec<Resource> =
            dedup_by(raw_resources?, |v| v.get("uri").and_then(Value::as_str).map(str::to_string))
                .into_iter()
                .filter_map(|v| serde_json::from_value::<Resource>(v).ok())
                .collect();
        let templates_raw = raw_templates?;

        // Resources and resource templates share one URI namespace for
        // dedup (spec §4.4): a template whose dedup key collides with an
        // already-seen resource URI is dropped.
        let mut seen: HashSet<String> = resources.iter().map(|r| r.uri.clone()).collect();
        let mut templates = Vec::new();
        for raw in templates_raw {
            let Ok(template) = serde_json::from_value::<ResourceTemplate>(raw) else {
                continue;
            };
            let key = template.uri_or_template().to_string();
            if !seen.insert(key) {
                continue;
            }
            templates.push(EnhancedResourceTemplate {
                analysis: ParameterAnalysis::from_resource_template(&template),
                template,
            });
        }

        *self.resources.write().await = resources
            .into_iter()
            .map(|resource| EnhancedResource {
                analysis: ParameterAnalysis::empty(),
                resource,
            })
            .collect();
        *self.resource_templates.write().await = templates;
        self.notify_listeners().await;

        Ok(())
    }

    pub async fn tools(&self) -> Vec<EnhancedTool> {
        self.tools.read().await.clone()
    }

    pub async fn prompts(&self) -> Vec<EnhancedPrompt> {
        self.prompts.read().await.clone()
    }

    pub async fn resources(&self) -> Vec<EnhancedResource> {
        self.resources.read().await.clone()
    }

    pub async fn resource_templates(&self) -> Vec<EnhancedResourceTemplate> {
        self.resource_templates.read().await.clone()
    }

    pub async fn find_tool(&self, name: &str) -> Option<EnhancedTool> {
        self.tools.read().await.iter().find(|t| t.tool.name == name).cloned()
    }

    /// Reset the catalog, e.g. on a new connection attempt (spec §3
    /// lifecycle: "Catalog and passive results reset on every new
    /// connection attempt").
    pub async fn clear(&self) {
        self.tools.write().await.clear();
        self.prompts.write().await.clear();
        self.resources.write().await.clear();
        self.resource_templates.write().await.clear();
    }
}

/// Deduplicate a list of raw JSON values on a key extracted by `key_of`,
/// dropping entries whose key is absent/null and keeping first-seen order.
fn dedup_by(items: Vec<Value>, key_of: impl Fn(&Value) -> Option<String>) -> Vec<Value> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|v| !v.is_null())
        .filter(|v| match key_of(v) {
            Some(key) => seen.insert(key),
            None => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedup_drops_duplicates_and_keeps_first() {
        let items = vec![
            json!({"name": "a", "v": 1}),
            json!({"name": "a", "v": 2}),
            json!({"name": "b", "v": 3}),
        ];
        let result = dedup_by(items, |v| v.get("name").and_then(Value::as_str).map(str::to_string));
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["v"], 1);
    }

    #[test]
    fn dedup_drops_null_entries() {
        let items = vec![Value::Null, json!({"name": "a"})];
        let result = dedup_by(items, |v| v.get("name").and_then(Value::as_str).map(str::to_string));
        assert_eq!(result.len(), 1);
    }
}
