//! getOpenEditors tool implementation.

use std::collections::HashMap;

use crate::editor;
use crate::protocol::ToolsCallResult;

use super::ToolContext;

/// Get the list of open editor surfaces from the host.
pub(crate) async fn get_open_editors(
    _arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    match editor::open_editors(&ctx.editor).await {
        Ok(editors) => ToolsCallResult::json(&editors),
        Err(e) => ToolsCallResult::failure(format!("Failed to query open editors: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ToolContent;
    use crate::tools::test_support;

    #[tokio::test]
    async fn returns_empty_list_from_editor() {
        let (ctx, _editor) = test_support::context();
        let result = get_open_editors(&HashMap::new(), &ctx).await;
        assert!(!result.is_error);
        let ToolContent::Text { text } = &result.content[0];
        assert_eq!(text, "[]");
    }
}
