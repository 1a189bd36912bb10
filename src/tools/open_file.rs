//! openFile tool implementation.

use std::collections::HashMap;

use crate::editor;
use crate::protocol::{OpenFileResult, ToolsCallResult};

use super::ToolContext;

/// Navigate the editor to a specific file, optionally at a line.
pub(crate) async fn open_file(
    arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    let file_path = match arguments.get("filePath").and_then(|v| v.as_str()) {
        Some(path) => path,
        None => {
            return ToolsCallResult::failure("Missing required parameter: filePath");
        }
    };

    let line = arguments
        .get("line")
        .and_then(|v| v.as_i64())
        .map(|l| l as u32);

    match editor::open_file(&ctx.editor, file_path, line).await {
        Ok(Ok(())) => ToolsCallResult::json(&OpenFileResult {
            success: true,
            error: None,
        }),
        Ok(Err(msg)) => ToolsCallResult::json(&OpenFileResult {
            success: false,
            error: Some(msg),
        }),
        Err(e) => ToolsCallResult::failure(format!("Failed to open file: {e}")),
    }
}
