//! Server configuration and authentication configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which transport a server connection uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Sse,
    Streamable,
}

/// A `{name, value}` pair, used for ordered URL-query and custom-header
/// lists where append order and duplicate names both matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: String,
}

/// API-key auth: a header carrying `prefix + apiKey`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyAuth {
    #[serde(rename = "apiKey", default)]
    pub api_key: String,
    #[serde(rename = "headerName", default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl ApiKeyAuth {
    /// Header name to use, defaulting to `Authorization`.
    pub fn header_name(&self) -> &str {
        self.header_name.as_deref().unwrap_or("Authorization")
    }

    /// Value prefix, defaulting to `"Bearer "`.
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or("Bearer ")
    }
}

/// HTTP Basic auth credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// The `combined` variant of the auth tagged union: any subset of
/// api-key, basic-auth, URL params, and custom headers may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedAuth {
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKeyAuth>,
    #[serde(rename = "basicAuth", default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    #[serde(rename = "urlParams", default)]
    pub url_params: Vec<NamedValue>,
    #[serde(rename = "customHeaders", default)]
    pub custom_headers: Vec<NamedValue>,
}

/// Authentication configuration: either no auth, or any combination of
/// api-key / basic-auth / URL params / custom headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    None,
    Combined(CombinedAuth),
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::None
    }
}

/// Configuration identifying and connecting to one MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    /// Origin URL, e.g. `https://example.com`.
    pub host: String,
    pub path: String,
    pub transport: TransportKind,
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// `host` joined with `path`, the URL the transport connects to before
    /// any auth-derived query parameters are appended.
    pub fn endpoint_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{host}{}", self.path)
        } else {
            format!("{host}/{}", self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_joins_host_and_path() {
        let cfg = ServerConfig {
            name: "s".into(),
            host: "https://example.com/".into(),
            path: "/mcp".into(),
            transport: TransportKind::Streamable,
            session_id: None,
            headers: None,
            auth: AuthConfig::None,
        };
        assert_eq!(cfg.endpoint_url(), "https://example.com/mcp");
    }

    #[test]
    fn auth_none_round_trips() {
        let auth = AuthConfig::None;
        let json = serde_json::to_string(&auth).unwrap();
        let back: AuthConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, auth);
    }
}
