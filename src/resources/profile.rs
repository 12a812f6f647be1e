//! Resource template: user://{id}/profile

use crate::error::{HandlerResult, ToolError};
use crate::protocol::{ReadResourceResult, ResourceContents, ResourceTemplate};
use crate::registry::{ResourceHandler, UriParams};
use async_trait::async_trait;
use serde::Serialize;

pub const USER_PROFILE_TEMPLATE: &str = "user://{id}/profile";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub role: String,
    pub email: String,
}

impl UserProfile {
    /// Known users resolve to their record; anyone else gets a guest profile.
    pub fn lookup(id: &str) -> Self {
        let (name, role, email) = match id {
            "1" => ("Alice".to_string(), "admin", "alice@example.com"),
            "2" => ("Bob".to_string(), "user", "bob@example.com"),
            other => (format!("User-{other}"), "guest", "unknown"),
        };

        Self {
            id: id.to_string(),
            name,
            role: role.into(),
            email: email.into(),
        }
    }
}

/// Mock user directory.
pub struct UserProfileResource;

impl UserProfileResource {
    pub fn descriptor() -> ResourceTemplate {
        ResourceTemplate {
            uri_template: USER_PROFILE_TEMPLATE.into(),
            name: "User profile".into(),
            description: Some("Profile information for a user id".into()),
            mime_type: Some("application/json".into()),
        }
    }
}

#[async_trait]
impl ResourceHandler for UserProfileResource {
    async fn read(&self, uri: &str, params: &UriParams) -> HandlerResult<ReadResourceResult> {
        let id = params
            .get("id")
            .ok_or(ToolError::MissingArgument("id".into()))?;

        let text = serde_json::to_string_pretty(&UserProfile::lookup(id))
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(uri, "application/json", text)],
        })
    }
}
