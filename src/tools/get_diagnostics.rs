//! getDiagnostics tool implementation.

use std::collections::HashMap;

use crate::editor;
use crate::protocol::ToolsCallResult;

use super::ToolContext;

/// Get diagnostics from the host editor, optionally filtered to one document.
pub(crate) async fn get_diagnostics(
    arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    let uri = arguments
        .get("uri")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    match editor::diagnostics(&ctx.editor, uri).await {
        Ok(diagnostics) => ToolsCallResult::json(&diagnostics),
        Err(e) => ToolsCallResult::failure(format!("Failed to query diagnostics: {e}")),
    }
}
