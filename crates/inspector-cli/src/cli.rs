//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line interface for the MCP security inspector.
#[derive(Parser, Debug)]
#[command(
    name = "inspector",
    version,
    about = "Connect to an MCP server, enumerate its artifacts, and run security scans."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect and enumerate tools, prompts, resources, and resource templates
    List(Connection),
    /// Invoke a single tool with raw JSON arguments
    Call {
        #[command(flatten)]
        conn: Connection,
        /// Tool name
        #[arg(long)]
        name: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        arguments: String,
    },
    /// Run an active security scan and print the resulting report
    Scan(Connection),
}

/// Connection configuration shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Connection {
    /// Path to a TOML file holding a `ServerConfig` (see `inspector_core::config`)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Transport protocol, overriding whatever the config file declares
    #[arg(long, value_enum)]
    pub transport: Option<TransportArg>,
    /// Server origin, e.g. `https://example.com`
    #[arg(long)]
    pub host: Option<String>,
    /// Path on the server, e.g. `/mcp`
    #[arg(long)]
    pub path: Option<String>,
    /// API key, sent as a bearer-prefixed `Authorization` header
    #[arg(long, env = "INSPECTOR_API_KEY")]
    pub api_key: Option<String>,
    /// Emit machine-readable JSON instead of formatted tables
    #[arg(long)]
    pub json: bool,
}

/// CLI-facing transport selector, mirroring `inspector_core::config::TransportKind`.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TransportArg {
    Sse,
    Streamable,
}
