//! getWorkspaceFolders tool implementation.

use std::collections::HashMap;

use crate::protocol::{ToolsCallResult, WorkspaceFolder};

use super::ToolContext;

/// Get the configured workspace roots as `file://` URIs.
pub(crate) async fn get_workspace_folders(
    _arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    let folders: Vec<WorkspaceFolder> = ctx
        .config
        .workspace_folders
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "workspace".to_string());
            WorkspaceFolder {
                uri: format!("file://{}", path.to_string_lossy()),
                name,
            }
        })
        .collect();

    ToolsCallResult::json(&folders)
}
