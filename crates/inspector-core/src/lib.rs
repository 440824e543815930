//! Core data model and error types shared by every layer of the MCP
//! security inspector: server/auth configuration, artifact entities and
//! their derived parameter analyses, the JSON-RPC message identifier, risk
//! severities, and the workspace-wide `Error`/`Result`.

mod artifacts;
mod config;
mod error;
mod kind;
mod message_id;
mod risk;
pub mod storage;

pub use artifacts::{
    EnhancedPrompt, EnhancedResource, EnhancedResourceTemplate, EnhancedTool, InputSchema,
    ParameterAnalysis, ParameterInfo, Prompt, PromptArgument, Resource, ResourceTemplate,
    SchemaProperty, SchemaType, Tool,
};
pub use config::{
    ApiKeyAuth, AuthConfig, BasicAuth, CombinedAuth, NamedValue, ServerConfig, TransportKind,
};
pub use error::{ConnectStage, Error, ProtocolErrorDetail, Result};
pub use kind::ArtifactKind;
pub use message_id::MessageId;
pub use risk::{max_risk_level, RiskLevel};
pub use storage::{MemoryStorage, Storage};
