//! Typed MCP client over any [`Transport`].

use crate::error::{McpError, ProtocolError, Result};
use crate::protocol::types::*;
use crate::transport::{Inbound, Transport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// MCP client. Requests are issued one at a time with increasing numeric ids.
pub struct McpClient<T: Transport> {
    transport: T,
    next_id: i64,
    server: Option<InitializeResult>,
}

impl<T: Transport> McpClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: 1,
            server: None,
        }
    }

    /// Result of the initialize exchange, once it has happened.
    pub fn server(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    /// Perform the handshake, then confirm it with `notifications/initialized`.
    pub async fn initialize(&mut self, client_info: ClientInfo) -> Result<InitializeResult> {
        let params = InitializeParams {
            protocol_version: MCP_VERSION.into(),
            capabilities: ClientCapabilities::default(),
            client_info,
        };
        let result: InitializeResult = self.request(methods::INITIALIZE, Some(params)).await?;

        self.notify(methods::INITIALIZED, None).await?;
        debug!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            "Connected"
        );
        self.server = Some(result.clone());
        Ok(result)
    }

    pub async fn list_tools(&mut self) -> Result<ListToolsResult> {
        self.request::<(), _>(methods::TOOLS_LIST, None).await
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let params = CallToolParams {
            name: name.into(),
            arguments,
        };
        self.request(methods::TOOLS_CALL, Some(params)).await
    }

    pub async fn list_resources(&mut self) -> Result<ListResourcesResult> {
        self.request::<(), _>(methods::RESOURCES_LIST, None).await
    }

    pub async fn read_resource(&mut self, uri: &str) -> Result<ReadResourceResult> {
        let params = ReadResourceParams { uri: uri.into() };
        self.request(methods::RESOURCES_READ, Some(params)).await
    }

    pub async fn list_prompts(&mut self) -> Result<ListPromptsResult> {
        self.request::<(), _>(methods::PROMPTS_LIST, None).await
    }

    pub async fn get_prompt(
        &mut self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<GetPromptResult> {
        let params = GetPromptParams {
            name: name.into(),
            arguments,
        };
        self.request(methods::PROMPTS_GET, Some(params)).await
    }

    pub async fn ping(&mut self) -> Result<()> {
        let _: Value = self.request::<(), _>(methods::PING, None).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }

    /// Send a request and wait for the response carrying its id.
    pub async fn request<P: Serialize, R: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<P>,
    ) -> Result<R> {
        let id = RequestId::Number(self.next_id);
        self.next_id += 1;

        let mut request = JsonRpcRequest::new(method).with_id(id.clone());
        if let Some(params) = params {
            request = request.with_params(serde_json::to_value(params)?);
        }
        self.transport.send(request.into()).await?;

        let response = self.await_response(&id).await?;
        if let Some(error) = response.error {
            return Err(McpError::Remote {
                code: error.code,
                message: error.message,
            });
        }
        Ok(serde_json::from_value(
            response.result.unwrap_or(Value::Null),
        )?)
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let mut notification = JsonRpcRequest::new(method);
        notification.params = params;
        self.transport.send(notification.into()).await
    }

    async fn await_response(&self, id: &RequestId) -> Result<JsonRpcResponse> {
        loop {
            match self.transport.receive().await? {
                None => {
                    return Err(ProtocolError::Transport("connection closed".into()).into());
                }
                Some(Inbound::Message(Message::Response(response)))
                    if response.id.as_ref() == Some(id) =>
                {
                    return Ok(response);
                }
                Some(Inbound::Message(Message::Response(response))) => {
                    warn!("Ignoring response for unknown id {:?}", response.id);
                }
                Some(Inbound::Message(Message::Request(request))) => {
                    debug!("Ignoring server message: {}", request.method);
                }
                Some(Inbound::Malformed { error, .. }) => {
                    warn!("Ignoring malformed frame: {}", error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{McpServer, McpServerBuilder, Session, TransportKind};
    use crate::server::{McpHandler, ServerStateBuilder};
    use crate::transport::ChannelTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn client_info() -> ClientInfo {
        ClientInfo {
            name: "test-client".into(),
            version: "1.0".into(),
        }
    }

    fn connect() -> McpClient<ChannelTransport> {
        let handler = McpHandler::new(Arc::new(ServerStateBuilder::new().build().unwrap()));
        let server: Arc<McpServer> =
            Arc::new(McpServerBuilder::new().handler(handler).build().unwrap());

        let (client_side, server_side) = ChannelTransport::pair(8);
        tokio::spawn(async move {
            server
                .serve_session(server_side, Arc::new(Session::new(TransportKind::Push)))
                .await
        });
        McpClient::new(client_side)
    }

    #[tokio::test]
    async fn test_initialize_then_call() {
        let mut client = connect();
        let server = client.initialize(client_info()).await.unwrap();
        assert_eq!(server.protocol_version, MCP_VERSION);
        assert!(client.server().is_some());

        let result = client
            .call_tool("calculate", json!({"operation": "add", "a": 2, "b": 3}))
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("Result: 5"));

        client.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_protocol_error_is_typed() {
        let mut client = connect();
        client.initialize(client_info()).await.unwrap();

        let err = client.call_tool("unknown", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::Remote { code: -32002, .. }));
    }

    #[tokio::test]
    async fn test_request_before_initialize_fails() {
        let mut client = connect();
        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, McpError::Remote { code: -32003, .. }));
    }

    #[tokio::test]
    async fn test_closed_connection() {
        let (client_side, server_side) = ChannelTransport::pair(1);
        drop(server_side);

        let mut client = McpClient::new(client_side);
        let err = client.ping().await.unwrap_err();
        assert!(matches!(
            err,
            McpError::Protocol(ProtocolError::Transport(_))
        ));
    }
}
