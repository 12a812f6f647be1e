//! Error types for the MCP server.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error object returned by the peer in answer to one of our requests.
    #[error("Server returned error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("Internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

/// JSON-RPC 2.0 and MCP protocol errors.
///
/// Every variant is rendered as a JSON-RPC error object correlated to the
/// request that caused it; none of them ends the session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: invalid JSON")]
    ParseError,

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("Internal error: {0}")]
    InternalError(Cow<'static, str>),

    /// Unknown tool or prompt name, or a resource URI nothing matches.
    #[error("{kind} not found: {key}")]
    TargetNotFound { kind: &'static str, key: String },

    /// A prompt was requested without one of its required arguments.
    #[error("Missing required argument '{argument}' for prompt '{prompt}'")]
    MissingArgument { prompt: String, argument: String },

    /// A method other than `initialize` arrived before negotiation finished.
    #[error("Session not initialized: '{0}' requires a completed initialize exchange")]
    NotInitialized(String),

    #[error("Session already initialized")]
    AlreadyInitialized,

    #[error("Session closed")]
    SessionClosed,

    #[error("Transport error: {0}")]
    Transport(Cow<'static, str>),
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::InternalError(_) => -32603,
            Self::TargetNotFound { .. } => -32002,
            Self::MissingArgument { .. } => -32602,
            Self::NotInitialized(_) => -32003,
            Self::AlreadyInitialized => -32600,
            Self::SessionClosed => -32004,
            Self::Transport(_) => -32000,
        }
    }
}

impl From<RegistryError> for ProtocolError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { category, key } => Self::TargetNotFound {
                kind: category.label(),
                key,
            },
            other => Self::InternalError(other.to_string().into()),
        }
    }
}

/// Capability categories held by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Tool,
    Resource,
    ResourceTemplate,
    Prompt,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Self::Tool => "Tool",
            Self::Resource => "Resource",
            Self::ResourceTemplate => "Resource template",
            Self::Prompt => "Prompt",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Capability registration and lookup errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{category} '{key}' is already registered")]
    DuplicateKey { category: Category, key: String },

    #[error("{category} not found: {key}")]
    NotFound { category: Category, key: String },

    #[error("Invalid resource URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: Cow<'static, str> },

    #[error("Invalid URI template '{template}': {reason}")]
    InvalidTemplate {
        template: String,
        reason: Cow<'static, str>,
    },
}

/// Failures reported by a tool, resource or prompt handler.
///
/// These are domain outcomes: for tools they are rendered as a successful
/// response carrying `isError: true`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(Cow<'static, str>),

    #[error("Cannot divide by zero")]
    DivisionByZero,

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },
}

/// Result type alias for McpError.
pub type Result<T> = std::result::Result<T, McpError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Result type alias for RegistryError.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type alias for handler outcomes.
pub type HandlerResult<T> = std::result::Result<T, ToolError>;
