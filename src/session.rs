//! Per-connection session state and the heartbeat probe.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::protocol::{JsonRpcId, JsonRpcRequest};

/// One accepted connection: its outbound channel and heartbeat task. Owned
/// exclusively by the manager's [`SessionSet`].
struct Session {
    id: String,
    tx: mpsc::Sender<Message>,
    heartbeat: JoinHandle<()>,
}

/// The live session set. All mutation goes through these methods.
pub(crate) struct SessionSet {
    sessions: Vec<Session>,
    next_id: u64,
}

impl SessionSet {
    pub(crate) fn new() -> Self {
        Self {
            sessions: Vec::new(),
            next_id: 1,
        }
    }

    pub(crate) fn add(&mut self, tx: mpsc::Sender<Message>, heartbeat: JoinHandle<()>) -> String {
        let id = format!("session-{}", self.next_id);
        self.next_id += 1;
        self.sessions.push(Session {
            id: id.clone(),
            tx,
            heartbeat,
        });
        id
    }

    /// Cancel the session's heartbeat and drop its outbound channel.
    /// Removing an already-removed session is a no-op.
    pub(crate) fn remove(&mut self, id: &str) {
        self.sessions.retain(|s| {
            if s.id == id {
                s.heartbeat.abort();
                false
            } else {
                true
            }
        });
    }

    /// Snapshot of every live session's outbound sender, for fan-out.
    pub(crate) fn snapshot(&self) -> Vec<mpsc::Sender<Message>> {
        self.sessions.iter().map(|s| s.tx.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Cancel every heartbeat before dropping the outbound channels, so no
    /// timer fires against a closing connection.
    pub(crate) fn close_all(&mut self) {
        for session in &self.sessions {
            session.heartbeat.abort();
        }
        self.sessions.clear();
    }
}

/// Spawn the liveness probe for one session: a `ping` request with a
/// monotonically increasing id on every tick. Fire-and-forget; the probe's
/// reply is ignored. A send that does not go through immediately (channel
/// full or closed) is treated as a dead connection: the task signals `dead`
/// and exits, and the connection handler force-closes the socket. This is
/// the only mechanism that reclaims sessions whose peer vanished without a
/// clean close.
pub(crate) fn spawn_heartbeat(
    tx: mpsc::Sender<Message>,
    interval: Duration,
    dead: oneshot::Sender<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so a fresh session
        // gets a full interval before its first probe.
        ticker.tick().await;
        let mut seq: i64 = 0;
        loop {
            ticker.tick().await;
            seq += 1;
            let ping = JsonRpcRequest::new(JsonRpcId::Number(seq), "ping", None);
            let Ok(text) = serde_json::to_string(&ping) else {
                continue;
            };
            if tx.try_send(Message::Text(text)).is_err() {
                debug!(seq, "heartbeat delivery failed, treating connection as dead");
                let _ = dead.send(());
                break;
            }
        }
    })
}
