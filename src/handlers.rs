//! JSON-RPC method dispatch for a client session.

use std::collections::HashMap;

use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcId, JsonRpcResponse,
    MCP_PROTOCOL_VERSION, ServerCapabilities, ServerInfo, ToolsCallParams, ToolsCallResult,
    ToolsCapability, ToolsListResult,
};
use crate::tools::{self, ToolContext};

/// Handle one MCP method call. `None` means the method was a notification
/// and no response frame should be written.
pub(crate) async fn handle_method(
    method: &str,
    params: Option<serde_json::Value>,
    id: Option<JsonRpcId>,
    ctx: &ToolContext,
) -> Option<JsonRpcResponse> {
    match method {
        "initialize" => Some(handle_initialize(params, id, ctx)),
        "initialized" => None,
        "ping" => Some(JsonRpcResponse::success(id, serde_json::json!({}))),
        "tools/list" => Some(handle_tools_list(id, ctx)),
        "tools/call" => Some(handle_tools_call(params, id, ctx).await),
        "notifications/cancelled" => None,
        _ => Some(JsonRpcResponse::error(
            id,
            JsonRpcError::method_not_found(method),
        )),
    }
}

fn handle_initialize(
    params: Option<serde_json::Value>,
    id: Option<JsonRpcId>,
    ctx: &ToolContext,
) -> JsonRpcResponse {
    let _init_params: InitializeParams = match params {
        Some(p) => match serde_json::from_value(p) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(&format!(
                        "Failed to parse initialize params: {e}"
                    )),
                );
            }
        },
        None => {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params("Missing initialize params"),
            );
        }
    };

    let result = InitializeResult {
        protocol_version: MCP_PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: false,
            }),
            resources: None,
            prompts: None,
        },
        server_info: ServerInfo {
            name: ctx.config.ide_name.clone(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        },
        instructions: Some(
            "This server bridges an AI assistant to a running editor. Use openDiff to \
             propose file edits for human review, and the query tools to inspect \
             selection, open editors, workspace folders, and diagnostics."
                .to_string(),
        ),
    };

    JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or_default())
}

fn handle_tools_list(id: Option<JsonRpcId>, ctx: &ToolContext) -> JsonRpcResponse {
    let result = ToolsListResult {
        tools: tools::all_tools(&ctx.config),
    };
    JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or_default())
}

async fn handle_tools_call(
    params: Option<serde_json::Value>,
    id: Option<JsonRpcId>,
    ctx: &ToolContext,
) -> JsonRpcResponse {
    let call_params: ToolsCallParams = match params {
        Some(p) => match serde_json::from_value(p) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(&format!(
                        "Failed to parse tools/call params: {e}"
                    )),
                );
            }
        },
        None => {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params("Missing tools/call params"),
            );
        }
    };

    let result = dispatch_tool(&call_params.name, &call_params.arguments, ctx).await;
    JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or_default())
}

async fn dispatch_tool(
    name: &str,
    arguments: &HashMap<String, serde_json::Value>,
    ctx: &ToolContext,
) -> ToolsCallResult {
    match name {
        "openDiff" => tools::open_diff(arguments, ctx).await,
        "close_tab" => tools::close_tab(arguments, ctx).await,
        "closeAllDiffTabs" => tools::close_all_diff_tabs(arguments, ctx).await,
        "getDiagnostics" => tools::get_diagnostics(arguments, ctx).await,
        "getCurrentSelection" => tools::get_current_selection(arguments, ctx).await,
        "getOpenEditors" => tools::get_open_editors(arguments, ctx).await,
        "getWorkspaceFolders" => tools::get_workspace_folders(arguments, ctx).await,
        "openFile" => tools::open_file(arguments, ctx).await,
        "executeCode" if ctx.config.enable_execute_code => {
            tools::execute_code(arguments, ctx).await
        }
        _ => ToolsCallResult::failure(format!("Unknown tool: {name}")),
    }
}
