//! Command-line interface for the MCP security inspector: connect over
//! either transport, enumerate a server's artifacts, invoke a tool, or run
//! a full active security scan.
//!
//! Grounded on `turbomcp-cli`'s `run_cli`/`commands` split
//! (`turbomcp-cli/src/lib.rs`, `turbomcp-cli/src/commands.rs`): a thin
//! `main.rs` calls into a library `run()`, which parses arguments and
//! dispatches to one async function per subcommand.

pub mod cli;
pub mod commands;
pub mod output;
pub mod settings;

use clap::Parser;

use cli::{Cli, Commands};

/// Parse arguments and execute the selected subcommand.
pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List(conn) => commands::list(conn).await,
        Commands::Call { conn, name, arguments } => commands::call(conn, name, arguments).await,
        Commands::Scan(conn) => commands::scan(conn).await,
    }
}
