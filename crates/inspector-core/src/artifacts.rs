//! Artifact entities (tools, resources, resource templates, prompts) and
//! their derived parameter analyses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The declared JSON-schema type of a tool input property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// One property of a tool's `inputSchema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#enum: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A tool's input schema: named properties plus which are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(default)]
    pub properties: HashMap<String, SchemaProperty>,
    #[serde(default)]
    pub required: Vec<String>,
}

/// An invocable tool advertised by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

impl Tool {
    /// Property names declared on the tool's input schema, in an arbitrary
    /// but stable order (sorted), for log formatting and test assertions.
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.input_schema.properties.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// A URI-addressable content resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A resource whose URI contains `{param}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceTemplate {
    /// Dedup key: `uri` if present, else `uriTemplate`. Resources and
    /// resource templates share one URI namespace for dedup purposes, and
    /// this accessor is the single site that decides which field wins —
    /// see the resolved REDESIGN FLAG in DESIGN.md.
    pub fn uri_or_template(&self) -> &str {
        self.uri.as_deref().unwrap_or(&self.uri_template)
    }

    /// Parameter names inferred from `{name}` placeholders via a stable
    /// left-to-right brace scan.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let bytes = self.uri_template.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'{' {
                if let Some(end) = self.uri_template[i + 1..].find('}') {
                    let name = &self.uri_template[i + 1..i + 1 + end];
                    if !name.is_empty() {
                        names.push(name.to_string());
                    }
                    i += end + 2;
                    continue;
                }
            }
            i += 1;
        }
        names
    }
}

/// A named argument accepted by a prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// A named, argument-parametric prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// One parameter surfaced by `ParameterAnalysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub required: bool,
}

/// Derived per-artifact parameter summary, computed once at catalog time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAnalysis {
    #[serde(rename = "hasParameters")]
    pub has_parameters: bool,
    pub count: usize,
    pub parameters: Vec<ParameterInfo>,
    #[serde(rename = "requiresSynthesis")]
    pub requires_synthesis: bool,
}

impl ParameterAnalysis {
    /// Build the analysis for a tool from its input schema.
    pub fn from_tool(tool: &Tool) -> Self {
        let required: std::collections::HashSet<&str> =
            tool.input_schema.required.iter().map(String::as_str).collect();
        let mut parameters: Vec<ParameterInfo> = tool
            .input_schema
            .properties
            .iter()
            .map(|(name, prop)| ParameterInfo {
                name: name.clone(),
                param_type: schema_type_name(prop.schema_type).to_string(),
                required: required.contains(name.as_str()),
            })
            .collect();
        parameters.sort_by(|a, b| a.name.cmp(&b.name));
        let count = parameters.len();
        Self {
            has_parameters: count > 0,
            count,
            parameters,
            requires_synthesis: count > 0,
        }
    }

    /// Build the analysis for a prompt from its declared arguments.
    pub fn from_prompt(prompt: &Prompt) -> Self {
        let parameters: Vec<ParameterInfo> = prompt
            .arguments
            .iter()
            .map(|arg| ParameterInfo {
                name: arg.name.clone(),
                param_type: "string".to_string(),
                required: arg.required,
            })
            .collect();
        let count = parameters.len();
        Self {
            has_parameters: count > 0,
            count,
            parameters,
            requires_synthesis: count > 0,
        }
    }

    /// Build the analysis for a resource template from its brace-scanned
    /// placeholder names.
    pub fn from_resource_template(template: &ResourceTemplate) -> Self {
        let parameters: Vec<ParameterInfo> = template
            .parameter_names()
            .into_iter()
            .map(|name| ParameterInfo {
                name,
                param_type: "string".to_string(),
                required: true,
            })
            .collect();
        let count = parameters.len();
        Self {
            has_parameters: count > 0,
            count,
            parameters,
            requires_synthesis: count > 0,
        }
    }

    /// A plain resource (no URI template) never has parameters.
    pub fn empty() -> Self {
        Self {
            has_parameters: false,
            count: 0,
            parameters: Vec::new(),
            requires_synthesis: false,
        }
    }
}

fn schema_type_name(t: SchemaType) -> &'static str {
    match t {
        SchemaType::String => "string",
        SchemaType::Integer => "integer",
        SchemaType::Number => "number",
        SchemaType::Boolean => "boolean",
        SchemaType::Array => "array",
        SchemaType::Object => "object",
    }
}

/// A tool paired with its derived parameter analysis, as held in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedTool {
    #[serde(flatten)]
    pub tool: Tool,
    pub analysis: ParameterAnalysis,
}

/// A prompt paired with its derived parameter analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedPrompt {
    #[serde(flatten)]
    pub prompt: Prompt,
    pub analysis: ParameterAnalysis,
}

/// A resource paired with its (empty) parameter analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedResource {
    #[serde(flatten)]
    pub resource: Resource,
    pub analysis: ParameterAnalysis,
}

/// A resource template paired with its derived parameter analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedResourceTemplate {
    #[serde(flatten)]
    pub template: ResourceTemplate,
    pub analysis: ParameterAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_scan_extracts_placeholders() {
        let template = ResourceTemplate {
            uri_template: "file:///{owner}/{repo}/blob/{path}".to_string(),
            uri: None,
            name: None,
            description: None,
            mime_type: None,
        };
        assert_eq!(template.parameter_names(), vec!["owner", "repo", "path"]);
    }

    #[test]
    fn dedup_key_prefers_uri_over_template() {
        let with_uri = ResourceTemplate {
            uri_template: "file:///{x}".to_string(),
            uri: Some("file:///concrete".to_string()),
            name: None,
            description: None,
            mime_type: None,
        };
        assert_eq!(with_uri.uri_or_template(), "file:///concrete");

        let without_uri = ResourceTemplate {
            uri_template: "file:///{x}".to_string(),
            uri: None,
            name: None,
            description: None,
            mime_type: None,
        };
        assert_eq!(without_uri.uri_or_template(), "file:///{x}");
    }

    #[test]
    fn tool_with_required_param_requires_synthesis() {
        let mut properties = HashMap::new();
        properties.insert(
            "msg".to_string(),
            SchemaProperty {
                schema_type: SchemaType::String,
                description: None,
                r#enum: None,
                default: None,
            },
        );
        let tool = Tool {
            name: "echo".to_string(),
            description: None,
            input_schema: InputSchema {
                properties,
                required: vec!["msg".to_string()],
            },
        };
        let analysis = ParameterAnalysis::from_tool(&tool);
        assert!(analysis.has_parameters);
        assert!(analysis.requires_synthesis);
        assert_eq!(analysis.count, 1);
        assert!(analysis.parameters[0].required);
    }
}
