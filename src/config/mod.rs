//! Configuration types and builders.

use crate::error::{ConfigError, McpError, Result};
use crate::protocol::codec::DEFAULT_MAX_MESSAGE_BYTES;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;

/// Default port for the SSE transport.
pub const DEFAULT_PORT: u16 = 3001;

/// Default bind address for the SSE transport.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Line-delimited JSON over stdin/stdout.
    #[default]
    Stdio,
    /// Server-sent events plus a POST submission endpoint.
    Sse,
}

impl TransportMode {
    /// Parse a transport mode from a string.
    ///
    /// Accepts various common aliases for each mode.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stdio" | "stream" => Some(Self::Stdio),
            "sse" | "push" | "http" => Some(Self::Sse),
            _ => None,
        }
    }
}

impl TryFrom<&str> for TransportMode {
    type Error = ConfigError;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        Self::parse(s).ok_or_else(|| ConfigError::InvalidValue {
            field: "transport".into(),
            message: format!("Unknown transport: '{}'. Valid transports: stdio, sse", s).into(),
        })
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub host: String,
    pub port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl TransportConfig {
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::new()
    }

    /// `host:port` for the SSE listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for TransportConfig with fluent API.
///
/// The mode has no default here: it must come from the command line or the
/// environment.
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    mode: Option<TransportMode>,
    host: String,
    port: u16,
}

impl TransportConfigBuilder {
    pub fn new() -> Self {
        Self {
            mode: None,
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }

    pub fn mode(mut self, mode: TransportMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Build from environment variables.
    pub fn from_env(self) -> Result<Self> {
        self.from_lookup(|key| env::var(key).ok())
    }

    /// Apply settings from an arbitrary key lookup. A mode chosen before this
    /// call is kept and `MCP_TRANSPORT` is not read.
    pub fn from_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if self.mode.is_none()
            && let Some(mode) = lookup("MCP_TRANSPORT")
        {
            self.mode = Some(TransportMode::try_from(mode.as_str()).map_err(McpError::Config)?);
        }

        if let Some(host) = lookup("MCP_HOST") {
            self.host = host;
        }

        if let Some(port) = lookup("MCP_PORT") {
            self.port = port.parse().map_err(|_| {
                McpError::Config(ConfigError::InvalidValue {
                    field: "MCP_PORT".into(),
                    message: "Invalid port number".into(),
                })
            })?;
        }

        Ok(self)
    }

    pub fn build(self) -> Result<TransportConfig> {
        let mode = self
            .mode
            .ok_or_else(|| ConfigError::MissingField("transport mode (stdio or sse)".into()))?;

        if mode == TransportMode::Sse {
            if self.host.is_empty() {
                return Err(ConfigError::MissingField("host".into()).into());
            }
            if self.port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "port".into(),
                    message: "Port must be greater than 0".into(),
                }
                .into());
            }
        }

        Ok(TransportConfig {
            mode,
            host: self.host,
            port: self.port,
        })
    }
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resource limits shared by both transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted frame, in bytes.
    pub max_message_bytes: usize,
    /// Capacity of per-session message channels.
    pub channel_capacity: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            channel_capacity: 64,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub transport: TransportConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "mcp-demo-server".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            transport: TransportConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.config.version = version.into();
        self
    }

    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.config.transport = transport;
        self
    }

    pub fn limits(mut self, limits: LimitsConfig) -> Self {
        self.config.limits = limits;
        self
    }

    /// Read limit overrides from environment variables.
    pub fn from_env(self) -> Result<Self> {
        self.from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup("MCP_MAX_MESSAGE_BYTES") {
            self.config.limits.max_message_bytes = parse_positive("MCP_MAX_MESSAGE_BYTES", &value)?;
        }

        if let Some(value) = lookup("MCP_CHANNEL_CAPACITY") {
            self.config.limits.channel_capacity = parse_positive("MCP_CHANNEL_CAPACITY", &value)?;
        }

        Ok(self)
    }

    pub fn build(self) -> Result<ServerConfig> {
        if self.config.name.is_empty() {
            return Err(ConfigError::MissingField("name".into()).into());
        }
        if self.config.limits.max_message_bytes == 0 || self.config.limits.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits".into(),
                message: "Limits must be greater than 0".into(),
            }
            .into());
        }
        Ok(self.config)
    }
}

fn parse_positive(field: &'static str, value: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            field: field.into(),
            message: "Expected a positive integer".into(),
        }
        .into()),
    }
}
