//! Server configuration supplied by the host editor adapter.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`crate::server::BridgeServer`].
///
/// The host passes this in at construction time; there is no config file.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Name reported in the discovery file and MCP `serverInfo`.
    pub ide_name: String,
    /// Workspace roots reported in the discovery file and the
    /// `getWorkspaceFolders` tool.
    pub workspace_folders: Vec<PathBuf>,
    /// Interval between heartbeat probes on each session.
    pub heartbeat_interval: Duration,
    /// Register the `executeCode` tool. Off by default; every invocation is
    /// logged at WARN.
    pub enable_execute_code: bool,
    /// Override the discovery lock directory (defaults to `~/.claude/ide`).
    pub lock_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ide_name: "coderelay".to_string(),
            workspace_folders: Vec::new(),
            heartbeat_interval: Duration::from_secs(5),
            enable_execute_code: false,
            lock_dir: None,
        }
    }
}
