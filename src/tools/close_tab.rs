//! close_tab tool implementation.

use std::collections::HashMap;

use crate::protocol::{CloseTabResult, ToolsCallResult};

use super::ToolContext;

/// Close the review surface shown under a tab name. Closing a tab that does
/// not exist is a deliberate no-op, not a failure: the user may already have
/// closed it by hand.
pub(crate) async fn close_tab(
    arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    let tab_name = match arguments.get("tabName").and_then(|v| v.as_str()) {
        Some(name) => name,
        None => return ToolsCallResult::failure("Missing required parameter: tabName"),
    };

    ctx.coordinator.close_tab(tab_name).await;
    ToolsCallResult::json(&CloseTabResult::closed())
}
