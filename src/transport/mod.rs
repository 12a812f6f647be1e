//! Transports carrying JSON-RPC envelopes between client and server.
//!
//! Both variants implement [`Transport`], so the session loop and the client
//! never know which one they are talking over.

pub mod channel;
pub mod sse;
pub mod stream;

pub use channel::ChannelTransport;
pub use sse::{AppState, PushConnection, SessionHub, build_router};
pub use stream::{LineTransport, StdioTransport};

use crate::error::{ProtocolError, Result};
use crate::protocol::{Message, RequestId};
use async_trait::async_trait;

/// One frame taken off a transport.
#[derive(Debug)]
pub enum Inbound {
    Message(Message),
    /// The frame could not be decoded. Framing is intact, so the connection
    /// can keep going after the error is answered.
    Malformed {
        id: Option<RequestId>,
        error: ProtocolError,
    },
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Next frame, or `None` once the peer has gone away.
    async fn receive(&self) -> Result<Option<Inbound>>;

    async fn send(&self, message: Message) -> Result<()>;

    /// Stop accepting traffic. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}
