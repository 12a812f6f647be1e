//! Tools: listFiles, readFile

use crate::error::HandlerResult;
use crate::protocol::{CallToolResult, Tool};
use crate::registry::ToolHandler;
use crate::tools::parse_args;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
pub struct ListFilesArgs {
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    ".".into()
}

#[derive(Debug, Deserialize)]
pub struct ReadFileArgs {
    pub path: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One directory entry as reported by `listFiles`.
#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

pub struct ListFilesTool;

impl ListFilesTool {
    pub fn definition() -> Tool {
        crate::define_tool! {
            name: "listFiles",
            description: "List files and directories at a path",
            schema: {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Directory to list (defaults to the working directory)"
                    }
                }
            }
        }
    }

    async fn entries(path: &str) -> HandlerResult<Vec<FileEntry>> {
        let mut dir = tokio::fs::read_dir(path).await?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if metadata.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: metadata.len(),
                modified: metadata
                    .modified()
                    .ok()
                    .map(|t| DateTime::<Utc>::from(t).to_rfc3339()),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[async_trait]
impl ToolHandler for ListFilesTool {
    #[instrument(skip(self, arguments))]
    async fn call(&self, arguments: Value) -> HandlerResult<CallToolResult> {
        let args: ListFilesArgs = parse_args(arguments)?;
        let entries = Self::entries(&args.path).await?;
        debug!("Listed {} entries in {}", entries.len(), args.path);
        Ok(CallToolResult::json(&entries))
    }
}

pub struct ReadFileTool;

impl ReadFileTool {
    pub fn definition() -> Tool {
        crate::define_tool! {
            name: "readFile",
            description: "Read the UTF-8 contents of a file",
            schema: {
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "File path" }
                },
                "required": ["path"]
            }
        }
    }
}

#[async_trait]
impl ToolHandler for ReadFileTool {
    #[instrument(skip(self, arguments))]
    async fn call(&self, arguments: Value) -> HandlerResult<CallToolResult> {
        let args: ReadFileArgs = parse_args(arguments)?;
        let content = tokio::fs::read_to_string(&args.path).await?;
        Ok(CallToolResult::text(content))
    }
}
