//! Loads a [`ServerConfig`] from an optional TOML file, layering CLI-flag
//! overrides on top (spec SPEC_FULL §2 "Configuration": "loads server
//! configuration from a TOML file via the `config` crate ... overridable by
//! CLI flags").

use anyhow::{Context, Result};
use inspector_core::{ApiKeyAuth, AuthConfig, CombinedAuth, ServerConfig, TransportKind};

use crate::cli::{Connection, TransportArg};

const DEFAULT_HOST: &str = "http://localhost:8080";
const DEFAULT_PATH: &str = "/mcp";

/// Resolve a [`ServerConfig`] for `conn`: start from the TOML file at
/// `conn.config` if given, then apply any explicitly-set CLI flags on top.
pub fn resolve(conn: &Connection) -> Result<ServerConfig> {
    let mut server = match &conn.config {
        Some(path) => {
            let settings = config::Config::builder()
                .add_source(config::File::from(path.as_path()))
                .build()
                .with_context(|| format!("loading config file {}", path.display()))?;
            settings
                .try_deserialize::<ServerConfig>()
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => default_server_config(),
    };

    if let Some(transport) = conn.transport {
        server.transport = match transport {
            TransportArg::Sse => TransportKind::Sse,
            TransportArg::Streamable => TransportKind::Streamable,
        };
    }
    if let Some(host) = &conn.host {
        server.host = host.clone();
    }
    if let Some(path) = &conn.path {
        server.path = path.clone();
    }
    if let Some(api_key) = &conn.api_key {
        server.auth = merge_api_key(server.auth, api_key.clone());
    }

    Ok(server)
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        name: "default".to_string(),
        host: DEFAULT_HOST.to_string(),
        path: DEFAULT_PATH.to_string(),
        transport: TransportKind::Streamable,
        session_id: None,
        headers: None,
        auth: AuthConfig::None,
    }
}

fn merge_api_key(auth: AuthConfig, api_key: String) -> AuthConfig {
    let mut combined = match auth {
        AuthConfig::Combined(c) => c,
        AuthConfig::None => CombinedAuth::default(),
    };
    combined.api_key = Some(ApiKeyAuth {
        api_key,
        header_name: None,
        prefix: None,
    });
    AuthConfig::Combined(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Connection;

    fn conn() -> Connection {
        Connection {
            config: None,
            transport: None,
            host: None,
            path: None,
            api_key: None,
            json: false,
        }
    }

    #[test]
    fn default_config_has_sensible_fallbacks() {
        let server = resolve(&conn()).unwrap();
        assert_eq!(server.host, DEFAULT_HOST);
        assert_eq!(server.transport, TransportKind::Streamable);
    }

    #[test]
    fn cli_flags_override_defaults() {
        let mut c = conn();
        c.host = Some("https://example.com".to_string());
        c.transport = Some(TransportArg::Sse);
        c.api_key = Some("secret".to_string());
        let server = resolve(&c).unwrap();
        assert_eq!(server.host, "https://example.com");
        assert_eq!(server.transport, TransportKind::Sse);
        match server.auth {
            AuthConfig::Combined(c) => assert_eq!(c.api_key.unwrap().api_key, "secret"),
            AuthConfig::None => panic!("expected combined auth"),
        }
    }
}
