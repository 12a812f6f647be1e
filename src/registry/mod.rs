//! Capability registry: tools, resources, resource templates and prompts.
//!
//! The registry is assembled once through [`RegistryBuilder`] and is read-only
//! afterwards, so it can be shared across sessions behind an `Arc` without
//! locking. It only resolves bindings; invoking handlers is the dispatcher's
//! job.

pub mod catalog;
pub mod handler;
pub mod resolver;
pub mod schema;

pub use catalog::{Binding, Catalog, Keyed};
pub use handler::{PromptArguments, PromptHandler, ResourceHandler, ToolHandler, UriParams};
pub use resolver::{Resolution, UriResolver, UriTemplate};
pub use schema::{ShapeViolation, check_arguments};

use crate::error::{Category, RegistryError, RegistryResult};
use crate::protocol::{Prompt, Resource, ResourceTemplate, Tool};
use std::sync::Arc;
use tracing::debug;

type ToolCatalog = Catalog<Tool, dyn ToolHandler>;
type ResourceCatalog = Catalog<Resource, dyn ResourceHandler>;
type TemplateCatalog = Catalog<ResourceTemplate, dyn ResourceHandler>;
type PromptCatalog = Catalog<Prompt, dyn PromptHandler>;

/// A resource lookup result: the bound handler plus any captured parameters.
pub struct ResolvedResource<'a> {
    pub resolution: Resolution,
    pub handler: &'a Arc<dyn ResourceHandler>,
}

/// Frozen set of capabilities.
pub struct CapabilityRegistry {
    tools: ToolCatalog,
    resources: ResourceCatalog,
    templates: TemplateCatalog,
    prompts: PromptCatalog,
    resolver: UriResolver,
}

impl CapabilityRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.descriptors().cloned().collect()
    }

    /// Literal resources and templates, kept apart.
    pub fn list_resources(&self) -> (Vec<Resource>, Vec<ResourceTemplate>) {
        (
            self.resources.descriptors().cloned().collect(),
            self.list_resource_templates(),
        )
    }

    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.templates.descriptors().cloned().collect()
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts.descriptors().cloned().collect()
    }

    pub fn tool(&self, name: &str) -> RegistryResult<&Binding<Tool, dyn ToolHandler>> {
        self.tools.get(name)
    }

    pub fn prompt(&self, name: &str) -> RegistryResult<&Binding<Prompt, dyn PromptHandler>> {
        self.prompts.get(name)
    }

    /// Handler for a resource key within the given resource category.
    pub fn resource_handler(
        &self,
        category: Category,
        key: &str,
    ) -> RegistryResult<&Arc<dyn ResourceHandler>> {
        match category {
            Category::Resource => self.resources.get(key).map(|b| &b.handler),
            Category::ResourceTemplate => self.templates.get(key).map(|b| &b.handler),
            other => Err(RegistryError::NotFound {
                category: other,
                key: key.to_string(),
            }),
        }
    }

    /// Whether `key` is registered in `category`.
    pub fn contains(&self, category: Category, key: &str) -> bool {
        match category {
            Category::Tool => self.tools.contains(key),
            Category::Resource => self.resources.contains(key),
            Category::ResourceTemplate => self.templates.contains(key),
            Category::Prompt => self.prompts.contains(key),
        }
    }

    /// Resolve a resource URI: literal first, then templates in order.
    pub fn resolve(&self, uri: &str) -> RegistryResult<ResolvedResource<'_>> {
        let resolution = self.resolver.resolve(uri)?;
        let handler = self.resource_handler(resolution.category, &resolution.key)?;
        Ok(ResolvedResource {
            resolution,
            handler,
        })
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    pub fn has_resources(&self) -> bool {
        !self.resources.is_empty() || !self.templates.is_empty()
    }

    pub fn has_prompts(&self) -> bool {
        !self.prompts.is_empty()
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.tools.len(),
            self.resources.len(),
            self.templates.len(),
            self.prompts.len(),
        )
    }
}

/// Collects capabilities at startup.
pub struct RegistryBuilder {
    tools: ToolCatalog,
    resources: ResourceCatalog,
    templates: TemplateCatalog,
    prompts: PromptCatalog,
    resolver: UriResolver,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            tools: Catalog::new(Category::Tool),
            resources: Catalog::new(Category::Resource),
            templates: Catalog::new(Category::ResourceTemplate),
            prompts: Catalog::new(Category::Prompt),
            resolver: UriResolver::new(),
        }
    }

    pub fn register_tool<H: ToolHandler + 'static>(
        &mut self,
        tool: Tool,
        handler: H,
    ) -> RegistryResult<&mut Self> {
        debug!("Registering tool: {}", tool.name);
        self.tools.insert(tool, Arc::new(handler))?;
        Ok(self)
    }

    pub fn register_resource<H: ResourceHandler + 'static>(
        &mut self,
        resource: Resource,
        handler: H,
    ) -> RegistryResult<&mut Self> {
        if resource.uri.is_empty() {
            return Err(RegistryError::InvalidUri {
                uri: resource.uri,
                reason: "URI must not be empty".into(),
            });
        }
        if resource.uri.contains(['{', '}']) {
            return Err(RegistryError::InvalidUri {
                uri: resource.uri,
                reason: "literal URIs cannot contain placeholders; register a template".into(),
            });
        }

        debug!("Registering resource: {}", resource.uri);
        let uri = resource.uri.clone();
        self.resources.insert(resource, Arc::new(handler))?;
        self.resolver.add_literal(uri);
        Ok(self)
    }

    pub fn register_resource_template<H: ResourceHandler + 'static>(
        &mut self,
        template: ResourceTemplate,
        handler: H,
    ) -> RegistryResult<&mut Self> {
        let compiled = UriTemplate::parse(&template.uri_template)?;

        debug!("Registering resource template: {}", template.uri_template);
        self.templates.insert(template, Arc::new(handler))?;
        self.resolver.add_template(compiled);
        Ok(self)
    }

    pub fn register_prompt<H: PromptHandler + 'static>(
        &mut self,
        prompt: Prompt,
        handler: H,
    ) -> RegistryResult<&mut Self> {
        debug!("Registering prompt: {}", prompt.name);
        self.prompts.insert(prompt, Arc::new(handler))?;
        Ok(self)
    }

    pub fn build(self) -> CapabilityRegistry {
        CapabilityRegistry {
            tools: self.tools,
            resources: self.resources,
            templates: self.templates,
            prompts: self.prompts,
            resolver: self.resolver,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
