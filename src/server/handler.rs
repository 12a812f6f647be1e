//! MCP request handler implementation.

use crate::error::{HandlerResult, ProtocolError, ProtocolResult, ToolError};
use crate::protocol::{
    CallToolParams, CallToolResult, GetPromptParams, GetPromptResult, Handler, InitializeParams,
    InitializeResult, ListPromptsResult, ListResourcesResult, ListToolsResult, MCP_VERSION,
    PromptsCapability, ReadResourceParams, ReadResourceResult, ResourcesCapability,
    ServerCapabilities, ServerInfo, ToolsCapability,
};
use crate::registry::check_arguments;
use crate::server::state::ServerState;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// MCP request handler backed by the capability registry.
pub struct McpHandler {
    state: Arc<ServerState>,
}

impl McpHandler {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    fn capabilities(&self) -> ServerCapabilities {
        let registry = &self.state.registry;
        ServerCapabilities {
            tools: registry.has_tools().then(|| ToolsCapability {
                list_changed: Some(false),
            }),
            resources: registry.has_resources().then(|| ResourcesCapability {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: registry.has_prompts().then(|| PromptsCapability {
                list_changed: Some(false),
            }),
        }
    }

    fn instructions(&self) -> String {
        let tools: Vec<_> = self
            .state
            .registry
            .list_tools()
            .into_iter()
            .map(|t| t.name)
            .collect();
        format!(
            "Demo MCP server. Available tools: {}. \
            Read system://info, user://{{id}}/profile or docs://{{topic}} for resources; \
            prompts: codeReview, explainConcept.",
            tools.join(", ")
        )
    }
}

/// Run a handler future; a panic comes back as `Err` with its message.
async fn guarded<T>(
    future: impl Future<Output = HandlerResult<T>>,
) -> Result<HandlerResult<T>, String> {
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".into())
}

/// Resource and prompt failures have no in-band error marker, so they surface
/// as protocol errors.
fn handler_failure(err: ToolError) -> ProtocolError {
    match err {
        e @ (ToolError::InvalidArguments(_) | ToolError::MissingArgument(_)) => {
            ProtocolError::InvalidParams(e.to_string().into())
        }
        other => ProtocolError::InternalError(other.to_string().into()),
    }
}

#[async_trait]
impl Handler for McpHandler {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
        info!(
            "Initialize request from {} v{}",
            params.client_info.name, params.client_info.version
        );
        debug!("Client capabilities: {:?}", params.capabilities);

        if params.protocol_version != MCP_VERSION {
            debug!(
                "Client requested protocol {}, answering with {}",
                params.protocol_version, MCP_VERSION
            );
        }

        Ok(InitializeResult {
            protocol_version: MCP_VERSION.into(),
            capabilities: self.capabilities(),
            server_info: ServerInfo {
                name: self.state.config.name.to_string(),
                version: self.state.config.version.to_string(),
            },
            instructions: Some(self.instructions()),
        })
    }

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
        let tools = self.state.registry.list_tools();
        debug!("Listing {} tools", tools.len());

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    #[instrument(skip(self, params), fields(tool = %params.name))]
    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
        let binding = self.state.registry.tool(&params.name)?;

        check_arguments(&binding.descriptor.input_schema, &params.arguments).map_err(|v| {
            ProtocolError::InvalidParams(format!("{}: {}", params.name, v).into())
        })?;

        match guarded(binding.handler.call(params.arguments)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                warn!("Tool execution failed: {}", e);
                Ok(CallToolResult::error(e.to_string()))
            }
            Err(panic) => {
                error!("Tool panicked: {}", panic);
                Ok(CallToolResult::error(format!(
                    "Tool '{}' failed unexpectedly: {}",
                    params.name, panic
                )))
            }
        }
    }

    async fn list_resources(&self) -> ProtocolResult<ListResourcesResult> {
        let (resources, resource_templates) = self.state.registry.list_resources();
        debug!(
            "Listing {} resources and {} templates",
            resources.len(),
            resource_templates.len()
        );

        Ok(ListResourcesResult {
            resources,
            resource_templates,
            next_cursor: None,
        })
    }

    #[instrument(skip(self, params), fields(uri = %params.uri))]
    async fn read_resource(&self, params: ReadResourceParams) -> ProtocolResult<ReadResourceResult> {
        let resolved = self.state.registry.resolve(&params.uri)?;
        debug!(
            category = %resolved.resolution.category,
            key = %resolved.resolution.key,
            "Resolved resource"
        );

        match guarded(resolved.handler.read(&params.uri, &resolved.resolution.params)).await {
            Ok(outcome) => outcome.map_err(handler_failure),
            Err(panic) => {
                error!("Resource handler panicked: {}", panic);
                Err(ProtocolError::InternalError(panic.into()))
            }
        }
    }

    async fn list_prompts(&self) -> ProtocolResult<ListPromptsResult> {
        Ok(ListPromptsResult {
            prompts: self.state.registry.list_prompts(),
            next_cursor: None,
        })
    }

    #[instrument(skip(self, params), fields(prompt = %params.name))]
    async fn get_prompt(&self, params: GetPromptParams) -> ProtocolResult<GetPromptResult> {
        let binding = self.state.registry.prompt(&params.name)?;

        if let Some(missing) = binding
            .descriptor
            .required_arguments()
            .find(|name| !params.arguments.contains_key(*name))
        {
            return Err(ProtocolError::MissingArgument {
                prompt: params.name.clone(),
                argument: missing.to_string(),
            });
        }

        match guarded(binding.handler.render(&params.arguments)).await {
            Ok(outcome) => outcome.map_err(handler_failure),
            Err(panic) => {
                error!("Prompt handler panicked: {}", panic);
                Err(ProtocolError::InternalError(panic.into()))
            }
        }
    }
}
