//! Handler traits bound to registered capabilities.
//!
//! Handlers never see protocol errors: they return either a payload or a
//! [`ToolError`](crate::error::ToolError), and the dispatcher decides how the
//! failure is rendered.

use crate::error::HandlerResult;
use crate::protocol::{CallToolResult, GetPromptResult, ReadResourceResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Parameters captured from a URI template match.
pub type UriParams = HashMap<String, String>;

/// Prompt arguments as supplied by the client.
pub type PromptArguments = HashMap<String, String>;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> HandlerResult<CallToolResult>;
}

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Read `uri`. `params` is empty for literal resources.
    async fn read(&self, uri: &str, params: &UriParams) -> HandlerResult<ReadResourceResult>;
}

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn render(&self, arguments: &PromptArguments) -> HandlerResult<GetPromptResult>;
}
