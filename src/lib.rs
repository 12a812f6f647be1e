//! Demo MCP server: tools, resources and prompts behind a JSON-RPC 2.0
//! dispatcher, reachable over stdio or server-sent events.
//!
//! # Example
//!
//! ```no_run
//! use mcp_demo_server::{
//!     config::{ServerConfig, TransportConfig, TransportMode},
//!     protocol::McpServerBuilder,
//!     server::{McpHandler, ServerStateBuilder},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!     let transport = TransportConfig::builder()
//!         .mode(TransportMode::Stdio)
//!         .build()?;
//!
//!     // Built-in tools, resources and prompts
//!     let state = Arc::new(ServerStateBuilder::new().config(config).build()?);
//!
//!     let server = McpServerBuilder::new()
//!         .handler(McpHandler::new(state))
//!         .build()?;
//!
//!     Arc::new(server).run(&transport).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prompts;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;

pub use client::McpClient;
pub use config::{ServerConfig, TransportConfig, TransportMode};
pub use error::{McpError, Result};
pub use protocol::{McpServer, McpServerBuilder};
pub use registry::{CapabilityRegistry, RegistryBuilder};
pub use server::{McpHandler, ServerState, ServerStateBuilder, builtin_registry};
