//! openDiff tool implementation.

use std::collections::HashMap;

use crate::diff::DiffOutcome;
use crate::protocol::{DiffStatus, OpenDiffResult, ToolsCallResult};

use super::ToolContext;

/// Open a proposed edit as a review surface and suspend until the user
/// accepts or rejects it. The suspension is human-paced; it runs on the
/// calling session's task only.
pub(crate) async fn open_diff(
    arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    let old_path = match required(arguments, "oldPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let new_path = match required(arguments, "newPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let new_contents = match required(arguments, "newContents") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let tab_name = match required(arguments, "tabName") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match ctx
        .coordinator
        .open_diff(old_path, new_path, new_contents, tab_name)
        .await
    {
        Ok(DiffOutcome::Saved { content }) => ToolsCallResult::json(&OpenDiffResult {
            status: DiffStatus::FileSaved,
            content: Some(content),
        }),
        Ok(DiffOutcome::Rejected) => ToolsCallResult::json(&OpenDiffResult {
            status: DiffStatus::DiffRejected,
            content: None,
        }),
        Err(e) => ToolsCallResult::failure(format!("Failed to open diff: {e}")),
    }
}

fn required<'a>(
    arguments: &'a HashMap<String, serde_json::Value>,
    name: &str,
) -> Result<&'a str, ToolsCallResult> {
    arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolsCallResult::failure(format!("Missing required parameter: {name}")))
}
