//! MCP tool implementations.
//!
//! Each tool maps an assistant request onto the diff coordinator or the
//! editor command channel:
//! - openDiff: open a review surface and wait for the human decision
//! - close_tab: drop the diff shown under a tab name
//! - closeAllDiffTabs: tear down every pending diff
//! - getDiagnostics: diagnostics from the host editor
//! - getCurrentSelection: selection/cursor snapshot
//! - getOpenEditors: open editor surfaces
//! - getWorkspaceFolders: configured workspace roots
//! - openFile: navigate the editor
//! - executeCode: host-side evaluation, opt-in only

mod close_all_diff_tabs;
mod close_tab;
mod execute_code;
mod get_current_selection;
mod get_diagnostics;
mod get_open_editors;
mod get_workspace_folders;
mod open_diff;
mod open_file;

pub(crate) use close_all_diff_tabs::close_all_diff_tabs;
pub(crate) use close_tab::close_tab;
pub(crate) use execute_code::execute_code;
pub(crate) use get_current_selection::get_current_selection;
pub(crate) use get_diagnostics::get_diagnostics;
pub(crate) use get_open_editors::get_open_editors;
pub(crate) use get_workspace_folders::get_workspace_folders;
pub(crate) use open_diff::open_diff;
pub(crate) use open_file::open_file;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::diff::DiffCoordinator;
use crate::editor::EditorHandle;
use crate::protocol::Tool;

/// Everything a tool call can reach: configuration, the editor channel, and
/// the shared diff coordinator.
pub(crate) struct ToolContext {
    pub(crate) config: ServerConfig,
    pub(crate) editor: EditorHandle,
    pub(crate) coordinator: Arc<DiffCoordinator>,
}

/// The advertised tool list. `executeCode` only appears when the opt-in flag
/// is set.
pub fn all_tools(config: &ServerConfig) -> Vec<Tool> {
    let mut tools = vec![
        Tool {
            name: "openDiff".to_string(),
            description: Some(
                "Open a proposed file edit as a review surface and wait for the user to \
                 accept or reject it. Resolves with FILE_SAVED and the saved content, or \
                 DIFF_REJECTED."
                    .to_string(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "oldPath": {
                        "type": "string",
                        "description": "Path of the file being replaced"
                    },
                    "newPath": {
                        "type": "string",
                        "description": "Path the edit would be saved to"
                    },
                    "newContents": {
                        "type": "string",
                        "description": "Proposed file contents"
                    },
                    "tabName": {
                        "type": "string",
                        "description": "Display name for the review surface"
                    }
                },
                "required": ["oldPath", "newPath", "newContents", "tabName"]
            }),
        },
        Tool {
            name: "close_tab".to_string(),
            description: Some(
                "Close the review surface shown under a tab name. A no-op when no surface \
                 matches."
                    .to_string(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "tabName": {
                        "type": "string",
                        "description": "Display name of the surface to close"
                    }
                },
                "required": ["tabName"]
            }),
        },
        Tool {
            name: "closeAllDiffTabs".to_string(),
            description: Some("Close every pending review surface.".to_string()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: "getDiagnostics".to_string(),
            description: Some(
                "Get diagnostics from the editor, optionally filtered to one document URI."
                    .to_string(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "uri": {
                        "type": "string",
                        "description": "Optional document URI. If omitted, returns diagnostics for all documents."
                    }
                },
                "required": []
            }),
        },
        Tool {
            name: "getCurrentSelection".to_string(),
            description: Some(
                "Get the currently selected text, with its file path and line range.".to_string(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: "getOpenEditors".to_string(),
            description: Some("Get the list of open editor surfaces.".to_string()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: "getWorkspaceFolders".to_string(),
            description: Some("Get the workspace roots for this session.".to_string()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: "openFile".to_string(),
            description: Some(
                "Navigate the editor to a file, optionally at a specific line.".to_string(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "filePath": {
                        "type": "string",
                        "description": "Path to the file to open"
                    },
                    "line": {
                        "type": "integer",
                        "description": "Optional line number to jump to"
                    }
                },
                "required": ["filePath"]
            }),
        },
    ];

    if config.enable_execute_code {
        tools.push(Tool {
            name: "executeCode".to_string(),
            description: Some(
                "Evaluate code in the host editor and return the stringified result. Only \
                 available when explicitly enabled."
                    .to_string(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Code to evaluate"
                    }
                },
                "required": ["code"]
            }),
        });
    }

    tools
}
