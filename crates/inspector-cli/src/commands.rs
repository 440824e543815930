//! Subcommand implementations: connect, enumerate, invoke, or scan.
//!
//! Each subcommand matches on [`inspector_core::TransportKind`] to build
//! the concrete transport, then hands off to a transport-generic inner
//! function — the same shape `turbomcp-cli/src/commands.rs` uses to
//! dispatch across its `stdio`/`ws`/`http` transports.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use inspector_core::{ServerConfig, TransportKind};
use inspector_detection::{DetectionEngine, RuleCatalog};
use inspector_protocol::ArtifactCatalog;
use inspector_protocol::ProtocolClient;
use inspector_scan::{NullLlm, PassiveMonitor, ScanOrchestrator};
use inspector_transport::{SseTransport, StreamableTransport, Transport};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cli::Connection;
use crate::{output, settings};

const CLIENT_NAME: &str = "inspector-cli";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a connected session needs to enumerate or invoke artifacts.
struct Session<T: Transport + 'static> {
    protocol: Arc<ProtocolClient<T>>,
    catalog: Arc<ArtifactCatalog>,
    engine: Arc<DetectionEngine>,
    rule_catalog: Arc<RuleCatalog>,
}

async fn connect<T: Transport + 'static>(transport: T) -> Result<Session<T>> {
    let protocol = ProtocolClient::new(Arc::new(transport));
    protocol.connect().await.context("connecting to server")?;
    protocol
        .initialize(CLIENT_NAME, CLIENT_VERSION)
        .await
        .context("initialize handshake")?;

    let storage = Arc::new(inspector_core::MemoryStorage::new());
    let engine = Arc::new(DetectionEngine::new());
    let rule_catalog = Arc::new(RuleCatalog::load(storage, engine.clone()));
    let monitor = PassiveMonitor::new(engine.clone(), rule_catalog.clone());
    protocol.set_observer(monitor).await;

    let catalog = ArtifactCatalog::new();
    catalog.populate(&protocol).await.context("enumerating artifacts")?;

    Ok(Session {
        protocol,
        catalog,
        engine,
        rule_catalog,
    })
}

fn user_headers(server: &ServerConfig) -> HashMap<String, String> {
    server.headers.clone().unwrap_or_default()
}

pub async fn list(conn: Connection) -> Result<()> {
    let server = settings::resolve(&conn)?;
    let json = conn.json;
    match server.transport {
        TransportKind::Sse => {
            let transport = SseTransport::new(
                server.host.clone(),
                server.path.clone(),
                server.auth.clone(),
                user_headers(&server),
            );
            list_with(transport, json).await
        }
        TransportKind::Streamable => {
            let transport = StreamableTransport::new(
                server.host.clone(),
                server.path.clone(),
                server.auth.clone(),
                user_headers(&server),
            );
            list_with(transport, json).await
        }
    }
}

async fn list_with<T: Transport + 'static>(transport: T, json: bool) -> Result<()> {
    let session = connect(transport).await?;
    let tools = session.catalog.tools().await;
    let prompts = session.catalog.prompts().await;
    let resources = session.catalog.resources().await;
    let templates = session.catalog.resource_templates().await;

    if json {
        let body = serde_json::json!({
            "tools": tools,
            "prompts": prompts,
            "resources": resources,
            "resourceTemplates": templates,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", output::tools_table(&tools));
        println!("{}", output::prompts_table(&prompts));
        println!("{}", output::resources_table(&resources, &templates));
    }

    session.protocol.disconnect().await.ok();
    Ok(())
}

pub async fn call(conn: Connection, name: String, arguments: String) -> Result<()> {
    let server = settings::resolve(&conn)?;
    let json = conn.json;
    let args: Value = serde_json::from_str(&arguments).context("parsing --arguments as JSON")?;
    match server.transport {
        TransportKind::Sse => {
            let transport = SseTransport::new(
                server.host.clone(),
                server.path.clone(),
                server.auth.clone(),
                user_headers(&server),
            );
            call_with(transport, name, args, json).await
        }
        TransportKind::Streamable => {
            let transport = StreamableTransport::new(
                server.host.clone(),
                server.path.clone(),
                server.auth.clone(),
                user_headers(&server),
            );
            call_with(transport, name, args, json).await
        }
    }
}

async fn call_with<T: Transport + 'static>(transport: T, name: String, args: Value, _json: bool) -> Result<()> {
    let session = connect(transport).await?;
    let result = session.protocol.call_tool(&name, args).await.context("calling tool")?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    session.protocol.disconnect().await.ok();
    Ok(())
}

pub async fn scan(conn: Connection) -> Result<()> {
    let server = settings::resolve(&conn)?;
    let json = conn.json;
    match server.transport {
        TransportKind::Sse => {
            let transport = SseTransport::new(
                server.host.clone(),
                server.path.clone(),
                server.auth.clone(),
                user_headers(&server),
            );
            scan_with(transport, json).await
        }
        TransportKind::Streamable => {
            let transport = StreamableTransport::new(
                server.host.clone(),
                server.path.clone(),
                server.auth.clone(),
                user_headers(&server),
            );
            scan_with(transport, json).await
        }
    }
}

async fn scan_with<T: Transport + 'static>(transport: T, json: bool) -> Result<()> {
    let session = connect(transport).await?;
    let orchestrator = ScanOrchestrator::new(
        session.protocol.clone(),
        session.catalog.clone(),
        session.engine.clone(),
        session.rule_catalog.clone(),
        Arc::new(NullLlm),
    );

    let (log_tx, mut log_rx) = tokio::sync::mpsc::channel(256);
    let log_task = tokio::spawn(async move {
        while let Some(entry) = log_rx.recv().await {
            tracing::info!(phase = ?entry.phase, "{}", entry.message);
        }
    });

    let cancel = CancellationToken::new();
    let report = orchestrator.run(cancel, log_tx).await.context("running scan")?;
    log_task.await.ok();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", output::scan_summary_table(&report));
        println!(
            "overall risk: {}  ({} issues: {} critical, {} high, {} medium, {} low)",
            report.overall_risk.as_str(),
            report.summary.total_issues,
            report.summary.critical_issues,
            report.summary.high_issues,
            report.summary.medium_issues,
            report.summary.low_issues,
        );
    }

    session.protocol.disconnect().await.ok();
    Ok(())
}
