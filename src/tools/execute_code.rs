//! executeCode tool implementation. Opt-in only.

use std::collections::HashMap;

use tracing::warn;

use crate::editor;
use crate::protocol::{ToolContent, ToolsCallResult};

use super::ToolContext;

/// Evaluate code in the host editor. Gated on the config flag; unreachable
/// through dispatch unless the host opted in. Every run is logged at WARN.
pub(crate) async fn execute_code(
    arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    if !ctx.config.enable_execute_code {
        return ToolsCallResult::failure("executeCode is disabled");
    }

    let code = match arguments.get("code").and_then(|v| v.as_str()) {
        Some(code) => code,
        None => return ToolsCallResult::failure("Missing required parameter: code"),
    };

    warn!(bytes = code.len(), "executing assistant-provided code in the host editor");

    match editor::execute_code(&ctx.editor, code).await {
        Ok(Ok(output)) => ToolsCallResult {
            content: vec![ToolContent::text(output)],
            is_error: false,
        },
        Ok(Err(msg)) => ToolsCallResult::failure(msg),
        Err(e) => ToolsCallResult::failure(format!("Failed to execute code: {e}")),
    }
}
