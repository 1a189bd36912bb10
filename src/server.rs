//! The bridge server: authenticated listener, session lifecycle, and the
//! public command surface the host editor adapter drives.
//!
//! One long-lived [`BridgeServer`] instance is constructed at host startup
//! and passed by reference into every command and event handler. Its
//! lifecycle is explicit: `start` binds the listener and publishes the
//! discovery file, `stop` tears everything down.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::diff::{DiffCoordinator, DiffKey};
use crate::editor::{EditorHandle, SelectionSnapshot, SurfaceId};
use crate::error::ServerError;
use crate::fanout::{self, SelectionTracker};
use crate::handlers;
use crate::lockfile::{self, LockFile};
use crate::protocol::{AtMentionedParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::session::{SessionSet, spawn_heartbeat};
use crate::tools::ToolContext;

/// Request header carrying the session secret, checked at upgrade time only.
pub const AUTH_HEADER: &str = "x-claude-code-ide-authorization";

/// State that only exists while the listener is active.
struct Running {
    port: u16,
    auth_token: String,
    lock_file: LockFile,
    accept_task: JoinHandle<()>,
}

/// The server manager. Owns the listener lifecycle, the live session set,
/// the diff coordinator, and the selection-tracking set.
pub struct BridgeServer {
    ctx: Arc<ToolContext>,
    sessions: Arc<RwLock<SessionSet>>,
    tracker: Mutex<SelectionTracker>,
    running: Mutex<Option<Running>>,
}

impl BridgeServer {
    /// Create a stopped server. `editor` is the host adapter's command
    /// channel; the server owns its own diff coordinator on top of it.
    pub fn new(config: ServerConfig, editor: EditorHandle) -> Self {
        let coordinator = Arc::new(DiffCoordinator::new(editor.clone()));
        Self {
            ctx: Arc::new(ToolContext {
                config,
                editor,
                coordinator,
            }),
            sessions: Arc::new(RwLock::new(SessionSet::new())),
            tracker: Mutex::new(SelectionTracker::new()),
            running: Mutex::new(None),
        }
    }

    /// Bind the listener on loopback and begin accepting. `port` of `None`
    /// picks an ephemeral port. Publishes the discovery file on success and
    /// returns the listening port.
    pub async fn start(&self, port: Option<u16>) -> Result<u16, ServerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let requested = port.unwrap_or(0);
        let listener = TcpListener::bind(("127.0.0.1", requested))
            .await
            .map_err(|e| match (e.kind(), port) {
                (io::ErrorKind::AddrInUse, Some(port)) => ServerError::PortUnavailable { port },
                _ => ServerError::Bind(e.to_string()),
            })?;
        let local_port = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(e.to_string()))?
            .port();

        let auth_token = lockfile::generate_auth_token();
        let lock_file = LockFile::create(
            self.ctx.config.lock_dir.as_deref(),
            local_port,
            &self.ctx.config.ide_name,
            &self.ctx.config.workspace_folders,
            &auth_token,
        )
        .await?;

        let accept_task = tokio::spawn(accept_loop(
            listener,
            auth_token.clone(),
            self.ctx.clone(),
            self.sessions.clone(),
        ));

        info!(port = local_port, "IDE bridge server listening");
        *running = Some(Running {
            port: local_port,
            auth_token,
            lock_file,
            accept_task,
        });
        Ok(local_port)
    }

    /// Stop accepting, resolve every pending diff as rejected, close every
    /// session (heartbeats first), and delete the discovery file.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let running = self
            .running
            .lock()
            .await
            .take()
            .ok_or(ServerError::NotRunning)?;

        running.accept_task.abort();

        // Terminal resolution before the sockets go away, so suspended
        // openDiff calls complete rather than hang.
        let drained = self.ctx.coordinator.close_all().await;
        if drained > 0 {
            info!(drained, "rejected pending diffs at shutdown");
        }

        self.sessions.write().await.close_all();
        self.tracker.lock().await.clear();

        running.lock_file.remove().await?;
        info!(port = running.port, "IDE bridge server stopped");
        Ok(())
    }

    /// Whether the listener is active.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// The listening port, while running.
    pub async fn port(&self) -> Option<u16> {
        self.running.lock().await.as_ref().map(|r| r.port)
    }

    /// The session secret, while running. Only for the host's own use; the
    /// assistant reads it from the discovery file.
    pub async fn auth_token(&self) -> Option<String> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|r| r.auth_token.clone())
    }

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of diffs awaiting a decision.
    pub async fn pending_diff_count(&self) -> usize {
        self.ctx.coordinator.pending_count().await
    }

    // ------------------------------------------------------------------
    // Editor-driven events and user commands
    // ------------------------------------------------------------------

    /// The user accepted the diff shown on `surface`. Returns `false` when
    /// the surface is not a tracked diff (already resolved or never ours).
    pub async fn accept_diff(&self, surface: SurfaceId) -> bool {
        self.ctx
            .coordinator
            .resolve_accept(DiffKey::for_surface(surface))
            .await
    }

    /// The user rejected the diff shown on `surface`.
    pub async fn reject_diff(&self, surface: SurfaceId) -> bool {
        self.ctx
            .coordinator
            .resolve_drop(DiffKey::for_surface(surface))
            .await
    }

    /// A surface was destroyed outside the accept/drop flow. Resolves any
    /// pending diff on it as dropped and forgets its selection tracking.
    pub async fn surface_closed(&self, surface: SurfaceId) {
        self.tracker.lock().await.surface_closed(surface);
        self.ctx
            .coordinator
            .resolve_on_surface_closed(DiffKey::for_surface(surface))
            .await;
    }

    /// Start streaming selection changes for `surface`.
    pub async fn track_selection(&self, surface: SurfaceId) {
        self.tracker.lock().await.enable(surface);
    }

    /// Stop streaming selection changes for `surface`, emitting one final
    /// empty-selection notification if the last one sent was non-empty.
    pub async fn untrack_selection(&self, surface: SurfaceId) {
        let last = self.tracker.lock().await.disable(surface);
        if let Some(params) = last {
            self.notify("selection_changed", serde_json::to_value(params).ok())
                .await;
        }
    }

    /// A motion event from the host. Broadcast to all sessions when the
    /// surface is tracked; ignored otherwise.
    pub async fn selection_changed(&self, surface: SurfaceId, snapshot: &SelectionSnapshot) {
        let params = self.tracker.lock().await.note_selection(surface, snapshot);
        if let Some(params) = params {
            self.notify("selection_changed", serde_json::to_value(params).ok())
                .await;
        }
    }

    /// The user mentioned a file range at the assistant.
    pub async fn at_mentioned(&self, file_path: &str, line_start: u32, line_end: u32) {
        let params = AtMentionedParams {
            file_path: file_path.to_string(),
            line_start,
            line_end,
        };
        self.notify("at_mentioned", serde_json::to_value(params).ok())
            .await;
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) {
        let snapshot = self.sessions.read().await.snapshot();
        fanout::broadcast(&snapshot, method, params);
    }
}

/// Accepts connections until aborted at server stop.
async fn accept_loop(
    listener: TcpListener,
    auth_token: String,
    ctx: Arc<ToolContext>,
    sessions: Arc<RwLock<SessionSet>>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let auth_token = auth_token.clone();
                let ctx = ctx.clone();
                let sessions = sessions.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, auth_token, ctx, sessions).await
                    {
                        debug!(%addr, "connection ended: {e}");
                    }
                });
            }
            Err(e) => {
                warn!("accept error: {e}");
            }
        }
    }
}

/// Byte-for-byte credential comparison without an early exit on mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Handle one inbound connection: authenticate the upgrade, run the session
/// until the peer closes, the transport fails, or the heartbeat declares the
/// connection dead.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    auth_token: String,
    ctx: Arc<ToolContext>,
    sessions: Arc<RwLock<SessionSet>>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    // Credential check happens inside the handshake; a rejected upgrade
    // never creates any session state.
    let check_auth = |req: &Request, response: Response| {
        let authorized = req
            .headers()
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| constant_time_eq(v.as_bytes(), auth_token.as_bytes()));
        if authorized {
            Ok(response)
        } else {
            warn!(%addr, "rejected connection with missing or invalid auth header");
            let mut response = ErrorResponse::new(Some("Unauthorized".to_string()));
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            Err(response)
        }
    };

    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, check_auth).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (client_tx, mut client_rx) = mpsc::channel::<Message>(32);
    let (dead_tx, mut dead_rx) = oneshot::channel();
    let heartbeat = spawn_heartbeat(
        client_tx.clone(),
        ctx.config.heartbeat_interval,
        dead_tx,
    );

    let session_id = sessions.write().await.add(client_tx.clone(), heartbeat);
    info!(%addr, session_id, "client connected");

    // Single writer per session: preserves per-session send order.
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = client_rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    // Each request runs on its own task so a suspended
                    // openDiff never blocks this session's other traffic.
                    let ctx = ctx.clone();
                    let tx = client_tx.clone();
                    tokio::spawn(async move {
                        if let Some(response) = handle_message(&text, &ctx).await {
                            let _ = tx.send(Message::Text(response)).await;
                        }
                    });
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = client_tx.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%addr, "receive error: {e}");
                    break;
                }
            },
            // Writer gone means the transport failed under us.
            _ = &mut writer => break,
            // Heartbeat declared the connection dead (or was cancelled).
            _ = &mut dead_rx => break,
        }
    }

    sessions.write().await.remove(&session_id);
    writer.abort();
    info!(%addr, session_id, "client disconnected");
    Ok(())
}

/// Parse one inbound frame and produce the serialized response, if any.
async fn handle_message(text: &str, ctx: &ToolContext) -> Option<String> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            let response = JsonRpcResponse::error(None, JsonRpcError::parse_error());
            return serde_json::to_string(&response).ok();
        }
    };

    // Frames without a method are protocol-level replies (e.g. answers to
    // our heartbeat pings); fire-and-forget, nothing to do.
    if value.get("method").is_none() {
        if value.get("result").is_some() || value.get("error").is_some() {
            return None;
        }
        let response = JsonRpcResponse::error(None, JsonRpcError::invalid_request("no method"));
        return serde_json::to_string(&response).ok();
    }

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            let response =
                JsonRpcResponse::error(None, JsonRpcError::invalid_request(&e.to_string()));
            return serde_json::to_string(&response).ok();
        }
    };

    if request.jsonrpc != "2.0" {
        let response = JsonRpcResponse::error(
            request.id,
            JsonRpcError::invalid_request("Expected jsonrpc version 2.0"),
        );
        return serde_json::to_string(&response).ok();
    }

    let response = handlers::handle_method(&request.method, request.params, request.id, ctx).await?;
    serde_json::to_string(&response).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffOutcome;
    use crate::editor::test_support::FakeEditor;
    use crate::protocol::LockFileContent;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    type WsClient = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    struct TestServer {
        server: Arc<BridgeServer>,
        port: u16,
        token: String,
        editor: FakeEditor,
        _lock_dir: tempfile::TempDir,
    }

    async fn start_server() -> TestServer {
        start_server_with(|_| {}).await
    }

    async fn start_server_with(tweak: impl FnOnce(&mut ServerConfig)) -> TestServer {
        let lock_dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig {
            workspace_folders: vec![PathBuf::from("/workspace")],
            lock_dir: Some(lock_dir.path().to_path_buf()),
            // Long enough to stay out of the way of short tests.
            heartbeat_interval: Duration::from_secs(3600),
            ..ServerConfig::default()
        };
        tweak(&mut config);

        let editor = FakeEditor::default();
        let server = Arc::new(BridgeServer::new(config, editor.clone().spawn()));
        let port = server.start(None).await.unwrap();
        let token = server.auth_token().await.unwrap();
        TestServer {
            server,
            port,
            token,
            editor,
            _lock_dir: lock_dir,
        }
    }

    async fn connect(port: u16, token: Option<&str>) -> Result<WsClient, tokio_tungstenite::tungstenite::Error> {
        let mut request = format!("ws://127.0.0.1:{port}")
            .into_client_request()
            .unwrap();
        if let Some(token) = token {
            request
                .headers_mut()
                .insert(AUTH_HEADER, token.parse().unwrap());
        }
        let (ws, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }

    async fn wait_for_clients(server: &BridgeServer, count: usize) {
        for _ in 0..500 {
            if server.client_count().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("client count never reached {count}");
    }

    /// Read frames until a tools/call response arrives, skipping heartbeat
    /// pings and other requests from the server.
    async fn next_response(ws: &mut WsClient) -> JsonRpcResponse {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for a response")
                .expect("connection closed")
                .unwrap();
            if let Message::Text(text) = msg {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                if value.get("method").is_none() {
                    return serde_json::from_str(&text).unwrap();
                }
            }
        }
    }

    fn tool_call(id: i64, name: &str, arguments: serde_json::Value) -> Message {
        Message::Text(
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": {"name": name, "arguments": arguments}
            })
            .to_string(),
        )
    }

    #[test]
    fn constant_time_eq_compares() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secre"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn start_assigns_port_and_publishes_discovery_file() {
        let t = start_server().await;
        assert_ne!(t.port, 0);
        assert!(t.server.is_running().await);
        assert_eq!(t.server.port().await, Some(t.port));

        let lock_path = t._lock_dir.path().join(format!("{}.lock", t.port));
        let raw = tokio::fs::read_to_string(&lock_path).await.unwrap();
        let content: LockFileContent = serde_json::from_str(&raw).unwrap();
        assert_eq!(content.auth_token.len(), 36);
        assert_eq!(content.auth_token, t.token);
        assert_eq!(content.transport, "ws");
        assert_eq!(content.workspace_folders, vec!["/workspace".to_string()]);

        t.server.stop().await.unwrap();
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn start_twice_is_already_running() {
        let t = start_server().await;
        let err = t.server.start(None).await.unwrap_err();
        assert!(matches!(err, ServerError::AlreadyRunning));
        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_when_stopped_is_not_running() {
        let t = start_server().await;
        t.server.stop().await.unwrap();
        let err = t.server.stop().await.unwrap_err();
        assert!(matches!(err, ServerError::NotRunning));
    }

    #[tokio::test]
    async fn requested_port_in_use_is_port_unavailable() {
        let t = start_server().await;

        let editor = FakeEditor::default();
        let other = BridgeServer::new(
            ServerConfig {
                lock_dir: Some(t._lock_dir.path().to_path_buf()),
                ..ServerConfig::default()
            },
            editor.spawn(),
        );
        let err = other.start(Some(t.port)).await.unwrap_err();
        assert!(matches!(err, ServerError::PortUnavailable { port } if port == t.port));

        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn authorized_client_is_counted_and_removed_on_close() {
        let t = start_server().await;
        assert_eq!(t.server.client_count().await, 0);

        let mut ws = connect(t.port, Some(&t.token)).await.unwrap();
        wait_for_clients(&t.server, 1).await;

        ws.close(None).await.unwrap();
        wait_for_clients(&t.server, 0).await;

        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn missing_or_wrong_token_is_rejected_without_session() {
        let t = start_server().await;

        assert!(connect(t.port, None).await.is_err());
        assert!(connect(t.port, Some("wrong-token")).await.is_err());

        assert_eq!(t.server.client_count().await, 0);
        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn open_diff_resolves_on_external_accept() {
        let t = start_server().await;
        let mut ws = connect(t.port, Some(&t.token)).await.unwrap();

        ws.send(tool_call(
            1,
            "openDiff",
            serde_json::json!({
                "oldPath": "/a.txt",
                "newPath": "/a.txt",
                "newContents": "hello\n",
                "tabName": "tab1"
            }),
        ))
        .await
        .unwrap();

        while t.server.pending_diff_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(t.server.accept_diff(SurfaceId(1)).await);
        // Losing triggers for the same key observe "not found".
        assert!(!t.server.reject_diff(SurfaceId(1)).await);

        let response = next_response(&mut ws).await;
        let result = response.result.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("FILE_SAVED"));
        assert!(text.contains("hello\\n"));

        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn open_diff_rejects_on_drop_without_readback() {
        let t = start_server().await;
        let mut ws = connect(t.port, Some(&t.token)).await.unwrap();

        ws.send(tool_call(
            1,
            "openDiff",
            serde_json::json!({
                "oldPath": "/a.txt",
                "newPath": "/a.txt",
                "newContents": "hello\n",
                "tabName": "tab1"
            }),
        ))
        .await
        .unwrap();

        while t.server.pending_diff_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(t.server.reject_diff(SurfaceId(1)).await);

        let response = next_response(&mut ws).await;
        let text = response.result.unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains("DIFF_REJECTED"));
        assert!(!text.contains("content"));

        // The rejected surface was closed.
        assert!(t.editor.surfaces.lock().await.is_empty());

        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn session_survives_other_traffic_while_diff_is_pending() {
        let t = start_server().await;
        let mut ws = connect(t.port, Some(&t.token)).await.unwrap();

        ws.send(tool_call(
            1,
            "openDiff",
            serde_json::json!({
                "oldPath": "/a.txt",
                "newPath": "/a.txt",
                "newContents": "hello\n",
                "tabName": "tab1"
            }),
        ))
        .await
        .unwrap();
        while t.server.pending_diff_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        // A second call on the same session completes while the first is
        // suspended.
        ws.send(tool_call(2, "getOpenEditors", serde_json::json!({})))
            .await
            .unwrap();
        let response = next_response(&mut ws).await;
        assert_eq!(response.id, Some(crate::protocol::JsonRpcId::Number(2)));

        t.server.accept_diff(SurfaceId(1)).await;
        let response = next_response(&mut ws).await;
        assert_eq!(response.id, Some(crate::protocol::JsonRpcId::Number(1)));

        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_terminates_pending_diffs_and_removes_lock_file() {
        let t = start_server().await;
        let lock_path = t._lock_dir.path().join(format!("{}.lock", t.port));

        // Two pending diffs opened directly on the coordinator, as a session
        // task would.
        let coordinator = t.server.ctx.coordinator.clone();
        let call1 = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator.open_diff("/a.txt", "/a.txt", "a\n", "tab1").await
            })
        };
        let call2 = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator.open_diff("/b.txt", "/b.txt", "b\n", "tab2").await
            })
        };
        while t.server.pending_diff_count().await < 2 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        t.server.stop().await.unwrap();

        // No caller hangs: both resolve as rejected.
        assert_eq!(call1.await.unwrap().unwrap(), DiffOutcome::Rejected);
        assert_eq!(call2.await.unwrap().unwrap(), DiffOutcome::Rejected);
        assert_eq!(t.server.pending_diff_count().await, 0);
        assert!(!lock_path.exists());
        assert!(!t.server.is_running().await);
    }

    #[tokio::test]
    async fn stop_closes_live_client_connections() {
        let t = start_server().await;
        let mut ws = connect(t.port, Some(&t.token)).await.unwrap();
        wait_for_clients(&t.server, 1).await;

        t.server.stop().await.unwrap();

        // Cancelling the session's heartbeat drops its dead-signal sender,
        // which tears the connection handler down; the client's stream must
        // terminate rather than idle on.
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        })
        .await
        .expect("client stream should terminate after stop");
    }

    #[tokio::test]
    async fn heartbeat_probes_carry_increasing_ids() {
        let t = start_server_with(|config| {
            config.heartbeat_interval = Duration::from_millis(20);
        })
        .await;
        let mut ws = connect(t.port, Some(&t.token)).await.unwrap();

        let mut ids = Vec::new();
        while ids.len() < 2 {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let Message::Text(text) = msg {
                let request: JsonRpcRequest = serde_json::from_str(&text).unwrap();
                assert_eq!(request.method, "ping");
                ids.push(request.id.unwrap());
            }
        }
        assert_eq!(ids[0], crate::protocol::JsonRpcId::Number(1));
        assert_eq!(ids[1], crate::protocol::JsonRpcId::Number(2));

        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn selection_notifications_follow_tracking() {
        let t = start_server().await;
        let mut ws = connect(t.port, Some(&t.token)).await.unwrap();
        wait_for_clients(&t.server, 1).await;

        let surface = SurfaceId(9);
        let snapshot = SelectionSnapshot {
            file_path: "/src/lib.rs".to_string(),
            text: "let x = 1;".to_string(),
            start: crate::protocol::Position { line: 4, character: 0 },
            end: crate::protocol::Position { line: 4, character: 10 },
        };

        // Untracked: no notification.
        t.server.selection_changed(surface, &snapshot).await;

        t.server.track_selection(surface).await;
        t.server.selection_changed(surface, &snapshot).await;
        // Disabling after a non-empty selection emits one final empty one.
        t.server.untrack_selection(surface).await;

        let mut notifications = Vec::new();
        while notifications.len() < 2 {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let Message::Text(text) = msg {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                if value["method"] == "selection_changed" {
                    notifications.push(value["params"].clone());
                }
            }
        }

        assert_eq!(notifications[0]["text"], "let x = 1;");
        assert_eq!(notifications[0]["selection"]["isEmpty"], false);
        assert_eq!(notifications[1]["text"], "");
        assert_eq!(notifications[1]["selection"]["isEmpty"], true);

        // Nothing further: disabling again emits nothing.
        t.server.untrack_selection(surface).await;

        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn at_mentioned_reaches_all_sessions() {
        let t = start_server().await;
        let mut ws1 = connect(t.port, Some(&t.token)).await.unwrap();
        let mut ws2 = connect(t.port, Some(&t.token)).await.unwrap();
        wait_for_clients(&t.server, 2).await;

        t.server.at_mentioned("/src/lib.rs", 3, 7).await;

        for ws in [&mut ws1, &mut ws2] {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            let Message::Text(text) = msg else { panic!("expected text frame") };
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["method"], "at_mentioned");
            assert_eq!(value["params"]["filePath"], "/src/lib.rs");
            assert_eq!(value["params"]["lineStart"], 3);
            assert_eq!(value["params"]["lineEnd"], 7);
        }

        t.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn close_tab_is_idempotent_over_the_wire() {
        let t = start_server().await;
        let mut ws = connect(t.port, Some(&t.token)).await.unwrap();

        for id in [1, 2] {
            ws.send(tool_call(
                id,
                "close_tab",
                serde_json::json!({"tabName": "missing.txt"}),
            ))
            .await
            .unwrap();
            let response = next_response(&mut ws).await;
            let text = response.result.unwrap()["content"][0]["text"]
                .as_str()
                .unwrap()
                .to_string();
            assert!(text.contains("TAB_CLOSED"));
        }

        t.server.stop().await.unwrap();
    }
}
