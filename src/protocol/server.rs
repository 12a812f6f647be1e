//! MCP server: runs one session loop per connected transport.

use crate::config::{LimitsConfig, TransportConfig, TransportMode};
use crate::error::{McpError, Result};
use crate::protocol::codec::Codec;
use crate::protocol::handler::{Dispatcher, Handler};
use crate::protocol::session::{Session, TransportKind};
use crate::protocol::types::*;
use crate::transport::{Inbound, LineTransport, Transport, sse};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info, instrument, warn};

/// MCP Server.
///
/// Holds the dispatcher shared by every session. Sessions never share any
/// other state, so any number of them can run concurrently.
pub struct McpServer {
    info: ServerInfo,
    dispatcher: Dispatcher,
    limits: LimitsConfig,
    active: AtomicUsize,
}

impl McpServer {
    pub fn new(handler: Arc<dyn Handler>, info: ServerInfo, limits: LimitsConfig) -> Self {
        Self {
            info,
            dispatcher: Dispatcher::new(handler),
            limits,
            active: AtomicUsize::new(0),
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    pub fn codec(&self) -> Codec {
        Codec::new(self.limits.max_message_bytes)
    }

    /// Number of session loops currently running.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Run the transport selected by `config` until it ends.
    pub async fn run(self: Arc<Self>, config: &TransportConfig) -> Result<()> {
        match config.mode {
            TransportMode::Stdio => self.run_stdio().await,
            TransportMode::Sse => self.run_sse(&config.bind_address()).await,
        }
    }

    /// Serve a single session over stdin/stdout.
    #[instrument(skip(self), fields(server = %self.info.name))]
    pub async fn run_stdio(&self) -> Result<()> {
        info!(
            "Starting MCP server: {} v{} on stdio",
            self.info.name, self.info.version
        );
        let transport = LineTransport::stdio(self.codec());
        self.serve_session(transport, Arc::new(Session::new(TransportKind::Stream)))
            .await;
        info!("Server stopped");
        Ok(())
    }

    /// Accept push sessions on `addr`, each served by its own task.
    pub async fn run_sse(self: Arc<Self>, addr: &str) -> Result<()> {
        info!(
            "Starting MCP server: {} v{} on SSE",
            self.info.name, self.info.version
        );
        sse::serve(self, addr).await
    }

    /// Drive one session until its transport ends or the session is closed.
    ///
    /// Frames are handled strictly in arrival order. A request arriving on a
    /// closed session is answered with the closed-session error; a result that
    /// completes after the session closed is discarded.
    #[instrument(skip_all, fields(session = %session.id(), transport = %session.transport()))]
    pub async fn serve_session<T: Transport>(&self, transport: T, session: Arc<Session>) {
        session.open();
        self.active.fetch_add(1, Ordering::SeqCst);
        debug!("Session loop started");

        loop {
            let inbound = match transport.receive().await {
                Ok(Some(inbound)) => inbound,
                Ok(None) => {
                    debug!("Peer disconnected");
                    break;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    break;
                }
            };

            let closed_before = session.is_closed();
            let response = match inbound {
                Inbound::Message(Message::Request(request)) => {
                    self.dispatcher.dispatch(request, &session).await
                }
                Inbound::Message(Message::Response(response)) => {
                    warn!("Unexpected response received: {:?}", response.id);
                    None
                }
                Inbound::Malformed { id, error } => {
                    warn!(code = error.code(), "Malformed frame: {}", error);
                    Some(JsonRpcResponse::error(id, JsonRpcError::from(&error)))
                }
            };

            if !closed_before && session.is_closed() {
                debug!("Discarding result for closed session");
                break;
            }

            if let Some(response) = response
                && let Err(e) = transport.send(response.into()).await
            {
                error!("Failed to send response: {}", e);
                break;
            }

            // A request that found the session closed has had its answer.
            if closed_before {
                break;
            }
        }

        session.begin_close();
        if let Err(e) = transport.close().await {
            debug!("Error closing transport: {}", e);
        }
        session.close();
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Builder for MCP Server.
pub struct McpServerBuilder {
    handler: Option<Arc<dyn Handler>>,
    name: String,
    version: String,
    limits: LimitsConfig,
}

impl McpServerBuilder {
    pub fn new() -> Self {
        Self {
            handler: None,
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
            limits: LimitsConfig::default(),
        }
    }

    pub fn handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn build(self) -> Result<McpServer> {
        let handler = self.handler.ok_or_else(|| McpError::Internal {
            message: "Handler is required".into(),
        })?;

        Ok(McpServer::new(
            handler,
            ServerInfo {
                name: self.name,
                version: self.version,
            },
            self.limits,
        ))
    }
}

impl Default for McpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
