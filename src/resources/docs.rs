//! Resource template: docs://{topic}

use crate::error::{HandlerResult, ToolError};
use crate::protocol::{ReadResourceResult, ResourceContents, ResourceTemplate};
use crate::registry::{ResourceHandler, UriParams};
use async_trait::async_trait;

pub const DOCS_TEMPLATE: &str = "docs://{topic}";

const TOPICS: [(&str, &str); 4] = [
    (
        "mcp",
        "The Model Context Protocol (MCP) is an open protocol that lets applications \
         expose tools, resources and prompts to language model clients.",
    ),
    (
        "tools",
        "Tools let a model perform actions such as calculations or API calls.",
    ),
    (
        "resources",
        "Resources provide data and context that a model can read.",
    ),
    (
        "prompts",
        "Prompts are reusable templates that standardize interactions.",
    ),
];

pub fn topic_text(topic: &str) -> String {
    TOPICS
        .iter()
        .find(|(name, _)| *name == topic)
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| format!("No documentation available for \"{topic}\""))
}

/// Static documentation pages.
pub struct DocsResource;

impl DocsResource {
    pub fn descriptor() -> ResourceTemplate {
        ResourceTemplate {
            uri_template: DOCS_TEMPLATE.into(),
            name: "Documentation".into(),
            description: Some("Documentation for a topic (mcp, tools, resources, prompts)".into()),
            mime_type: Some("text/plain".into()),
        }
    }
}

#[async_trait]
impl ResourceHandler for DocsResource {
    async fn read(&self, uri: &str, params: &UriParams) -> HandlerResult<ReadResourceResult> {
        let topic = params
            .get("topic")
            .ok_or(ToolError::MissingArgument("topic".into()))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(uri, "text/plain", topic_text(topic))],
        })
    }
}
