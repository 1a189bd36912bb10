//! Diff coordination: correlating a long-lived `openDiff` call with a later,
//! out-of-band accept/drop decision.
//!
//! The correlation table is the one piece of state mutated from three
//! triggers: the inbound tool call, a user command (accept/drop), and a
//! surface-teardown event. Every resolution path removes the record under the
//! table lock before completing its continuation, so exactly one trigger wins
//! and the others observe "not found". The lock is never held across an
//! editor round-trip.

use std::collections::HashMap;

use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

use crate::editor::{self, EditorHandle, SurfaceId};
use crate::error::ServerError;

/// Correlation key for a pending diff: host process identity plus surface
/// handle. Not the tab name or file path, both of which can collide or be
/// reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiffKey {
    pub pid: u32,
    pub surface: SurfaceId,
}

impl DiffKey {
    pub fn for_surface(surface: SurfaceId) -> Self {
        Self {
            pid: std::process::id(),
            surface,
        }
    }
}

/// Terminal outcome of a diff request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Accepted; carries the surface's text at resolution time.
    Saved { content: String },
    /// Dropped, closed out-of-band, or torn down at server stop.
    Rejected,
}

struct PendingDiff {
    file_path: String,
    tab_name: String,
    surface: SurfaceId,
    done: oneshot::Sender<DiffOutcome>,
}

/// The pending-diff correlation table. Single source of truth for "which
/// proposed edits are awaiting a decision".
pub struct DiffCoordinator {
    editor: EditorHandle,
    pending: Mutex<HashMap<DiffKey, PendingDiff>>,
}

impl DiffCoordinator {
    pub fn new(editor: EditorHandle) -> Self {
        Self {
            editor,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Open a diff surface and suspend until it is resolved.
    ///
    /// This is the system's only long-blocking operation: it may stay open
    /// for a human-scale duration. It runs on the calling session's task and
    /// never blocks the accept loop or other sessions.
    pub async fn open_diff(
        &self,
        old_path: &str,
        new_path: &str,
        contents: &str,
        tab_name: &str,
    ) -> Result<DiffOutcome, ServerError> {
        let surface = editor::open_diff_surface(&self.editor, old_path, new_path, contents, tab_name)
            .await?
            .map_err(ServerError::Editor)?;

        let key = DiffKey::for_surface(surface);
        let (done, rx) = oneshot::channel();

        let superseded = {
            let mut pending = self.pending.lock().await;
            let prev = pending.remove(&key);
            pending.insert(
                key,
                PendingDiff {
                    file_path: new_path.to_string(),
                    tab_name: tab_name.to_string(),
                    surface,
                    done,
                },
            );
            prev
        };
        if let Some(prev) = superseded {
            // A colliding key supersedes: the earlier caller gets a rejection
            // rather than hanging.
            warn!(tab_name = %prev.tab_name, "superseding pending diff with colliding key");
            let _ = prev.done.send(DiffOutcome::Rejected);
        }

        debug!(?key, tab_name, "diff registered, awaiting decision");

        // A dropped sender means the table was torn down without an explicit
        // resolution; treat it as terminal rejection so the caller never hangs.
        Ok(rx.await.unwrap_or(DiffOutcome::Rejected))
    }

    /// Resolve a pending diff as accepted: read back the surface's current
    /// text (clearing its modified flag) and complete the continuation with
    /// it. Returns `false` if `key` is not a tracked diff (an expected race,
    /// not an error).
    pub async fn resolve_accept(&self, key: DiffKey) -> bool {
        let Some(record) = self.pending.lock().await.remove(&key) else {
            return false;
        };

        let outcome = match editor::save_surface(&self.editor, record.surface).await {
            Ok(Some(content)) => DiffOutcome::Saved { content },
            // Surface vanished between the decision and the read-back, or the
            // editor is gone; the continuation still must complete.
            Ok(None) | Err(_) => DiffOutcome::Rejected,
        };

        debug!(?key, file_path = %record.file_path, "diff resolved by accept");
        let _ = record.done.send(outcome);
        true
    }

    /// Resolve a pending diff as dropped. No content read-back; the surface
    /// is closed best-effort. Returns `false` for an unknown key.
    pub async fn resolve_drop(&self, key: DiffKey) -> bool {
        let Some(record) = self.pending.lock().await.remove(&key) else {
            return false;
        };

        debug!(?key, file_path = %record.file_path, "diff resolved by drop");
        let _ = record.done.send(DiffOutcome::Rejected);
        let _ = editor::close_surface(&self.editor, record.surface).await;
        true
    }

    /// The surface was destroyed by means other than accept/drop (e.g. the
    /// user closed the buffer). Resolves as a drop; no editor calls, the
    /// surface is already gone.
    pub async fn resolve_on_surface_closed(&self, key: DiffKey) -> bool {
        let Some(record) = self.pending.lock().await.remove(&key) else {
            return false;
        };

        debug!(?key, file_path = %record.file_path, "diff resolved by surface teardown");
        let _ = record.done.send(DiffOutcome::Rejected);
        true
    }

    /// Resolve the pending diff displayed under `tab_name`, if any, as a
    /// drop and close its surface. Returns `false` when no surface matches.
    pub async fn close_tab(&self, tab_name: &str) -> bool {
        let record = {
            let mut pending = self.pending.lock().await;
            let key = pending
                .iter()
                .find(|(_, r)| r.tab_name == tab_name)
                .map(|(k, _)| *k);
            key.and_then(|k| pending.remove(&k))
        };

        match record {
            Some(record) => {
                let _ = record.done.send(DiffOutcome::Rejected);
                let _ = editor::close_surface(&self.editor, record.surface).await;
                true
            }
            None => false,
        }
    }

    /// Tear down every pending diff: records are removed and completed as
    /// rejected in place, then their surfaces are closed. A later
    /// surface-closed event for the same key finds nothing and no-ops, so no
    /// continuation is resolved twice. Returns the number torn down.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<PendingDiff> = {
            let mut pending = self.pending.lock().await;
            pending.drain().map(|(_, record)| record).collect()
        };

        let count = drained.len();
        for record in drained {
            let _ = record.done.send(DiffOutcome::Rejected);
            let _ = editor::close_surface(&self.editor, record.surface).await;
        }
        if count > 0 {
            debug!(count, "closed all pending diffs");
        }
        count
    }

    /// Number of diffs awaiting a decision.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
