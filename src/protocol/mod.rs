//! MCP protocol implementation over JSON-RPC 2.0.

pub mod codec;
pub mod handler;
pub mod server;
pub mod session;
pub mod types;

pub use codec::Codec;
pub use handler::{Dispatcher, Handler};
pub use server::{McpServer, McpServerBuilder};
pub use session::{Negotiated, Session, SessionState, TransportKind};
pub use types::*;
