//! Server state management.

use crate::config::ServerConfig;
use crate::error::{RegistryResult, Result};
use crate::registry::{CapabilityRegistry, RegistryBuilder};
use std::sync::Arc;
use tracing::info;

/// Build the registry holding every built-in tool, resource and prompt.
pub fn builtin_registry() -> RegistryResult<CapabilityRegistry> {
    let mut builder = RegistryBuilder::new();
    crate::tools::register(&mut builder)?;
    crate::resources::register(&mut builder)?;
    crate::prompts::register(&mut builder)?;
    Ok(builder.build())
}

/// Process-wide state shared by every session. Read-only once built.
///
/// Nothing in here is session specific: negotiation state lives on
/// [`Session`](crate::protocol::Session).
pub struct ServerState {
    pub config: ServerConfig,
    pub registry: Arc<CapabilityRegistry>,
}

impl ServerState {
    pub fn new(config: ServerConfig, registry: Arc<CapabilityRegistry>) -> Self {
        Self { config, registry }
    }
}

pub struct ServerStateBuilder {
    config: Option<ServerConfig>,
    registry: Option<Arc<CapabilityRegistry>>,
}

impl ServerStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            registry: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn registry(mut self, registry: Arc<CapabilityRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Falls back to the default config and the built-in registry.
    pub fn build(self) -> Result<ServerState> {
        let config = self.config.unwrap_or_default();
        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(builtin_registry()?),
        };

        let (tools, resources, templates, prompts) = registry.counts();
        info!(tools, resources, templates, prompts, "Capability registry ready");

        Ok(ServerState::new(config, registry))
    }
}

impl Default for ServerStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
