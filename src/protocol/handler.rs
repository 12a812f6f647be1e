//! Request handler and method dispatcher.

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::session::{Negotiated, Session};
use crate::protocol::types::*;
use async_trait::async_trait;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Handler trait for processing MCP requests.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle initialize request.
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult>;

    /// List available tools.
    async fn list_tools(&self) -> ProtocolResult<ListToolsResult>;

    /// Call a tool.
    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult>;

    /// List literal resources and resource templates.
    async fn list_resources(&self) -> ProtocolResult<ListResourcesResult>;

    /// List resource templates only.
    async fn list_resource_templates(&self) -> ProtocolResult<ListResourceTemplatesResult> {
        let listing = self.list_resources().await?;
        Ok(ListResourceTemplatesResult {
            resource_templates: listing.resource_templates,
            next_cursor: None,
        })
    }

    /// Read a resource by URI.
    async fn read_resource(&self, params: ReadResourceParams) -> ProtocolResult<ReadResourceResult>;

    /// List available prompts.
    async fn list_prompts(&self) -> ProtocolResult<ListPromptsResult>;

    /// Render a prompt.
    async fn get_prompt(&self, params: GetPromptParams) -> ProtocolResult<GetPromptResult>;

    /// Handle ping request.
    async fn ping(&self) -> ProtocolResult<Value> {
        Ok(serde_json::json!({}))
    }
}

type RouteFuture<'a> = BoxFuture<'a, ProtocolResult<Value>>;
type Route = for<'a> fn(&'a dyn Handler, &'a Session, Option<Value>) -> RouteFuture<'a>;

/// Method name to route function. Fixed at compile time.
static ROUTES: Lazy<HashMap<&'static str, Route>> = Lazy::new(|| {
    let table: [(&'static str, Route); 10] = [
        (methods::INITIALIZE, route_initialize),
        (methods::PING, route_ping),
        (methods::TOOLS_LIST, route_list_tools),
        (methods::TOOLS_CALL, route_call_tool),
        (methods::RESOURCES_LIST, route_list_resources),
        (methods::RESOURCES_TEMPLATES_LIST, route_list_resource_templates),
        (methods::RESOURCES_READ, route_read_resource),
        (methods::PROMPTS_LIST, route_list_prompts),
        (methods::PROMPTS_GET, route_get_prompt),
        (methods::INITIALIZED, route_initialized),
    ];
    table.into_iter().collect()
});

/// Method dispatcher that routes requests to appropriate handlers.
///
/// Stateless apart from the shared handler; one instance serves every session.
#[derive(Clone)]
pub struct Dispatcher {
    handler: Arc<dyn Handler>,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    /// Whether `method` has an entry in the routing table.
    pub fn is_routed(method: &str) -> bool {
        ROUTES.contains_key(method)
    }

    /// Dispatch a message for `session`. Notifications produce no response.
    #[instrument(skip(self, request, session), fields(method = %request.method, session = %session.id()))]
    pub async fn dispatch(
        &self,
        request: JsonRpcRequest,
        session: &Session,
    ) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            self.notify(request, session);
            return None;
        }

        let id = request.id.clone();
        debug!("Dispatching request: {}", request.method);

        match self.route(request, session).await {
            Ok(value) => Some(JsonRpcResponse::success(id, value)),
            Err(e) => {
                warn!(code = e.code(), "Request failed: {}", e);
                Some(JsonRpcResponse::error(id, JsonRpcError::from(&e)))
            }
        }
    }

    async fn route(&self, request: JsonRpcRequest, session: &Session) -> ProtocolResult<Value> {
        // Every id that gets a response is claimed, refused ones included.
        if let Some(id) = &request.id {
            session.claim_id(id)?;
        }
        session.admit(&request.method)?;

        let route = ROUTES
            .get(request.method.as_str())
            .ok_or_else(|| ProtocolError::MethodNotFound(request.method.clone()))?;

        route(self.handler.as_ref(), session, request.params).await
    }

    fn notify(&self, request: JsonRpcRequest, session: &Session) {
        if session.is_closed() {
            debug!("Dropping notification for closed session");
            return;
        }
        match request.method.as_str() {
            methods::INITIALIZED => debug!("Client confirmed initialization"),
            other => debug!("Ignoring notification: {}", other),
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> ProtocolResult<T> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| ProtocolError::InvalidParams(e.to_string().into()))?
        .ok_or_else(|| ProtocolError::InvalidParams("Missing params".into()))
}

fn to_value<T: Serialize>(result: T) -> ProtocolResult<Value> {
    serde_json::to_value(result).map_err(|e| ProtocolError::InternalError(e.to_string().into()))
}

fn route_initialize<'a>(
    handler: &'a dyn Handler,
    session: &'a Session,
    params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move {
        let params: InitializeParams = parse_params(params)?;
        let negotiated = Negotiated {
            client_info: params.client_info.clone(),
            capabilities: params.capabilities.clone(),
            protocol_version: params.protocol_version.clone(),
        };

        let result = handler.initialize(params).await?;
        session.activate(negotiated);
        to_value(result)
    })
}

fn route_initialized<'a>(
    _handler: &'a dyn Handler,
    _session: &'a Session,
    _params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move { Ok(Value::Null) })
}

fn route_ping<'a>(
    handler: &'a dyn Handler,
    _session: &'a Session,
    _params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move { handler.ping().await })
}

fn route_list_tools<'a>(
    handler: &'a dyn Handler,
    _session: &'a Session,
    _params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move { to_value(handler.list_tools().await?) })
}

fn route_call_tool<'a>(
    handler: &'a dyn Handler,
    _session: &'a Session,
    params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move { to_value(handler.call_tool(parse_params(params)?).await?) })
}

fn route_list_resources<'a>(
    handler: &'a dyn Handler,
    _session: &'a Session,
    _params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move { to_value(handler.list_resources().await?) })
}

fn route_list_resource_templates<'a>(
    handler: &'a dyn Handler,
    _session: &'a Session,
    _params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move { to_value(handler.list_resource_templates().await?) })
}

fn route_read_resource<'a>(
    handler: &'a dyn Handler,
    _session: &'a Session,
    params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move { to_value(handler.read_resource(parse_params(params)?).await?) })
}

fn route_list_prompts<'a>(
    handler: &'a dyn Handler,
    _session: &'a Session,
    _params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move { to_value(handler.list_prompts().await?) })
}

fn route_get_prompt<'a>(
    handler: &'a dyn Handler,
    _session: &'a Session,
    params: Option<Value>,
) -> RouteFuture<'a> {
    Box::pin(async move { to_value(handler.get_prompt(parse_params(params)?).await?) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::session::{SessionState, TransportKind};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MockHandler {
        initialized: AtomicBool,
    }

    impl MockHandler {
        fn new() -> Self {
            Self {
                initialized: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Handler for MockHandler {
        async fn initialize(&self, _params: InitializeParams) -> ProtocolResult<InitializeResult> {
            self.initialized.store(true, Ordering::SeqCst);
            Ok(InitializeResult {
                protocol_version: MCP_VERSION.into(),
                capabilities: ServerCapabilities::default(),
                server_info: ServerInfo {
                    name: "test".into(),
                    version: "1.0".into(),
                },
                instructions: None,
            })
        }

        async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
            Ok(ListToolsResult {
                tools: vec![],
                next_cursor: None,
            })
        }

        async fn call_tool(&self, _params: CallToolParams) -> ProtocolResult<CallToolResult> {
            Ok(CallToolResult::text("test"))
        }

        async fn list_resources(&self) -> ProtocolResult<ListResourcesResult> {
            Ok(ListResourcesResult {
                resources: vec![],
                resource_templates: vec![],
                next_cursor: None,
            })
        }

        async fn read_resource(
            &self,
            params: ReadResourceParams,
        ) -> ProtocolResult<ReadResourceResult> {
            Err(ProtocolError::TargetNotFound {
                kind: "Resource",
                key: params.uri,
            })
        }

        async fn list_prompts(&self) -> ProtocolResult<ListPromptsResult> {
            Ok(ListPromptsResult {
                prompts: vec![],
                next_cursor: None,
            })
        }

        async fn get_prompt(&self, params: GetPromptParams) -> ProtocolResult<GetPromptResult> {
            Err(ProtocolError::TargetNotFound {
                kind: "Prompt",
                key: params.name,
            })
        }
    }

    fn initialize_request(id: i64) -> JsonRpcRequest {
        JsonRpcRequest::new("initialize")
            .with_id(id)
            .with_params(serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {
                    "name": "test-client",
                    "version": "1.0"
                }
            }))
    }

    fn open_session() -> Session {
        let session = Session::new(TransportKind::Stream);
        session.open();
        session
    }

    #[test]
    fn test_route_table_covers_core_methods() {
        for method in [
            "tools/list",
            "tools/call",
            "resources/list",
            "resources/read",
            "prompts/list",
            "prompts/get",
            "initialize",
        ] {
            assert!(Dispatcher::is_routed(method), "{method} is not routed");
        }
        assert!(!Dispatcher::is_routed("tools/delete"));
    }

    #[tokio::test]
    async fn test_dispatcher_initialize() {
        let handler = Arc::new(MockHandler::new());
        let dispatcher = Dispatcher::new(handler.clone());
        let session = open_session();

        let response = dispatcher
            .dispatch(initialize_request(1), &session)
            .await
            .unwrap();
        assert!(response.result.is_some());
        assert!(response.error.is_none());
        assert!(handler.initialized.load(Ordering::SeqCst));
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn test_method_before_initialize_is_sequence_error() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler::new()));
        let session = open_session();

        let request = JsonRpcRequest::new("tools/list").with_id(1);
        let response = dispatcher.dispatch(request, &session).await.unwrap();

        assert_eq!(response.error.unwrap().code, -32003);
        assert_eq!(session.state(), SessionState::Negotiating);
    }

    #[tokio::test]
    async fn test_dispatcher_unknown_method() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler::new()));
        let session = open_session();
        dispatcher.dispatch(initialize_request(1), &session).await;

        let request = JsonRpcRequest::new("unknown/method").with_id(2);
        let response = dispatcher.dispatch(request, &session).await.unwrap();

        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler::new()));
        let session = open_session();

        let request = JsonRpcRequest::new("notifications/initialized");
        assert!(dispatcher.dispatch(request, &session).await.is_none());
    }

    #[tokio::test]
    async fn test_reused_id_is_rejected() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler::new()));
        let session = open_session();
        dispatcher.dispatch(initialize_request(1), &session).await;

        let first = JsonRpcRequest::new("tools/list").with_id(2);
        let again = JsonRpcRequest::new("tools/list").with_id(2);
        assert!(
            dispatcher
                .dispatch(first, &session)
                .await
                .unwrap()
                .error
                .is_none()
        );

        let response = dispatcher.dispatch(again, &session).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_refused_id_stays_claimed() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler::new()));
        let session = open_session();

        let early = JsonRpcRequest::new("tools/list").with_id(1);
        let response = dispatcher.dispatch(early, &session).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32003);

        let response = dispatcher
            .dispatch(initialize_request(1), &session)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32600);
        assert_eq!(session.state(), SessionState::Negotiating);

        let response = dispatcher
            .dispatch(initialize_request(2), &session)
            .await
            .unwrap();
        assert!(response.error.is_none());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_late_request() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler::new()));
        let session = open_session();
        dispatcher.dispatch(initialize_request(1), &session).await;
        session.close();

        let request = JsonRpcRequest::new("tools/list").with_id(2);
        let response = dispatcher.dispatch(request, &session).await.unwrap();

        assert_eq!(response.id, Some(RequestId::Number(2)));
        assert_eq!(response.error.unwrap().code, -32004);
    }

    #[tokio::test]
    async fn test_missing_params_is_invalid_params() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler::new()));
        let session = open_session();
        dispatcher.dispatch(initialize_request(1), &session).await;

        let request = JsonRpcRequest::new("tools/call").with_id(2);
        let response = dispatcher.dispatch(request, &session).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_error_response_keeps_correlation_id() {
        let dispatcher = Dispatcher::new(Arc::new(MockHandler::new()));
        let session = open_session();
        dispatcher.dispatch(initialize_request(1), &session).await;

        let request = JsonRpcRequest::new("resources/read")
            .with_id("req-7")
            .with_params(serde_json::json!({"uri": "nothing://here"}));
        let response = dispatcher.dispatch(request, &session).await.unwrap();

        assert_eq!(response.id, Some(RequestId::String("req-7".into())));
        assert_eq!(response.error.unwrap().code, -32002);
    }
}
