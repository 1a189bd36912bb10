//! getCurrentSelection tool implementation.

use std::collections::HashMap;

use crate::editor;
use crate::protocol::{SelectionRange, SelectionResult, ToolContent, ToolsCallResult};

use super::ToolContext;

/// Get the currently selected text from the host editor.
pub(crate) async fn get_current_selection(
    _arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    match editor::current_selection(&ctx.editor).await {
        Ok(Some(snapshot)) => ToolsCallResult::json(&SelectionResult {
            file_path: snapshot.file_path.clone(),
            text: snapshot.text.clone(),
            selection: SelectionRange {
                start: snapshot.start,
                end: snapshot.end,
            },
        }),
        Ok(None) => ToolsCallResult {
            content: vec![ToolContent::text(
                r#"{"error": "No selection", "message": "No text is currently selected"}"#,
            )],
            is_error: false,
        },
        Err(e) => ToolsCallResult::failure(format!("Failed to query selection: {e}")),
    }
}
