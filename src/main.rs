//! MCP server binary entry point.

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use mcp_demo_server::{
    config::{ServerConfig, TransportConfig, TransportMode},
    protocol::McpServerBuilder,
    server::{McpHandler, ServerStateBuilder},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

const USAGE: &str = "Usage: mcp-demo-server [--stdio | --sse [--port <port>] [--host <host>]]";

/// Demo MCP server exposing tools, resources and prompts.
#[derive(Parser, Debug)]
#[command(name = "mcp-demo-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serve a single session over stdin/stdout.
    #[arg(long, conflicts_with = "sse")]
    stdio: bool,

    /// Serve sessions over server-sent events.
    #[arg(long)]
    sse: bool,

    /// Listening port for --sse.
    #[arg(long)]
    port: Option<u16>,

    /// Bind address for --sse.
    #[arg(long)]
    host: Option<String>,
}

impl Cli {
    fn mode(&self) -> Option<TransportMode> {
        match (self.stdio, self.sse) {
            (true, _) => Some(TransportMode::Stdio),
            (_, true) => Some(TransportMode::Sse),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing();

    let transport = match transport_config(&cli) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    info!(
        "Starting {} v{} ({:?} transport)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        transport.mode
    );

    let config = ServerConfig::builder()
        .from_env()?
        .transport(transport)
        .build()?;

    let state = Arc::new(ServerStateBuilder::new().config(config.clone()).build()?);
    let server = McpServerBuilder::new()
        .handler(McpHandler::new(state))
        .name(config.name.to_string())
        .version(config.version.to_string())
        .limits(config.limits.clone())
        .build()?;

    Arc::new(server).run(&config.transport).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Bad arguments exit with status 1; help and version exit normally.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    }
}

/// Flags override the environment. A mode flag is applied first so a bad
/// `MCP_TRANSPORT` is never consulted.
fn transport_config(cli: &Cli) -> mcp_demo_server::Result<TransportConfig> {
    let mut builder = TransportConfig::builder();
    if let Some(mode) = cli.mode() {
        builder = builder.mode(mode);
    }
    let mut builder = builder.from_env()?;
    if let Some(host) = &cli.host {
        builder = builder.host(host.clone());
    }
    if let Some(port) = cli.port {
        builder = builder.port(port);
    }
    builder.build()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcp_demo_server=info,warn"));

    // JSON to stderr; stdout carries the stdio transport
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
