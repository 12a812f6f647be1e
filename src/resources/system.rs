//! Resource: system://info

use crate::error::{HandlerResult, ToolError};
use crate::protocol::{ReadResourceResult, Resource, ResourceContents};
use crate::registry::{ResourceHandler, UriParams};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;

pub const SYSTEM_INFO_URI: &str = "system://info";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemInfo {
    platform: &'static str,
    arch: &'static str,
    pid: u32,
    uptime: f64,
    server_version: &'static str,
    timestamp: String,
}

/// Runtime information about the server process.
pub struct SystemInfoResource {
    started: Instant,
}

impl SystemInfoResource {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn descriptor() -> Resource {
        Resource {
            uri: SYSTEM_INFO_URI.into(),
            name: "System information".into(),
            description: Some("Runtime information about the server process".into()),
            mime_type: Some("application/json".into()),
        }
    }
}

impl Default for SystemInfoResource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceHandler for SystemInfoResource {
    async fn read(&self, uri: &str, _params: &UriParams) -> HandlerResult<ReadResourceResult> {
        let info = SystemInfo {
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            pid: std::process::id(),
            uptime: self.started.elapsed().as_secs_f64(),
            server_version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now().to_rfc3339(),
        };
        let text = serde_json::to_string_pretty(&info)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(uri, "application/json", text)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_system_info_fields() {
        let result = SystemInfoResource::new()
            .read(SYSTEM_INFO_URI, &UriParams::new())
            .await
            .unwrap();

        let contents = &result.contents[0];
        assert_eq!(contents.uri, SYSTEM_INFO_URI);
        assert_eq!(contents.mime_type.as_deref(), Some("application/json"));

        let info: Value = serde_json::from_str(contents.text.as_deref().unwrap()).unwrap();
        assert_eq!(info["platform"], std::env::consts::OS);
        assert_eq!(info["pid"], std::process::id());
        assert!(info["uptime"].as_f64().unwrap() >= 0.0);
    }
}
