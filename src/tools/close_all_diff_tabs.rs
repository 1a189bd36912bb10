//! closeAllDiffTabs tool implementation.

use std::collections::HashMap;

use crate::protocol::{CloseAllDiffTabsResult, ToolsCallResult};

use super::ToolContext;

/// Tear down every pending review surface and report how many were closed.
pub(crate) async fn close_all_diff_tabs(
    _arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    let count = ctx.coordinator.close_all().await;
    ToolsCallResult::json(&CloseAllDiffTabsResult::closed(count))
}
