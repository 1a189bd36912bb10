//! Best-effort notification fan-out and selection tracking.
//!
//! Fan-out iterates a snapshot of the live sessions taken at send time.
//! Delivery uses `try_send`: a session whose outbound channel is full or
//! closed is skipped, never retried and never allowed to block the others.
//! Per-session order is preserved by the session's single writer channel.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::trace;

use crate::editor::{SelectionSnapshot, SurfaceId};
use crate::protocol::{JsonRpcNotification, SelectionChangedParams, SelectionSpan};

/// Serialize one notification and push it to every session in the snapshot.
/// Returns how many sessions it was handed to.
pub(crate) fn broadcast(
    snapshot: &[mpsc::Sender<Message>],
    method: &str,
    params: Option<serde_json::Value>,
) -> usize {
    let notification = JsonRpcNotification::new(method, params);
    let Ok(text) = serde_json::to_string(&notification) else {
        return 0;
    };

    let mut delivered = 0;
    for tx in snapshot {
        if tx.try_send(Message::Text(text.clone())).is_ok() {
            delivered += 1;
        }
    }
    trace!(method, delivered, total = snapshot.len(), "notification fan-out");
    delivered
}

/// Build `selection_changed` params from an editor snapshot.
pub(crate) fn selection_params(snapshot: &SelectionSnapshot) -> SelectionChangedParams {
    SelectionChangedParams {
        text: snapshot.text.clone(),
        file_path: snapshot.file_path.clone(),
        file_url: format!("file://{}", snapshot.file_path),
        selection: SelectionSpan {
            start: snapshot.start,
            end: snapshot.end,
            is_empty: snapshot.is_empty(),
        },
    }
}

/// Which surfaces stream selection changes, with a "last notified" memory per
/// surface so that disabling tracking after a non-empty selection emits one
/// final empty-selection notification, returning the remote view to a clean
/// state.
pub(crate) struct SelectionTracker {
    tracked: HashMap<SurfaceId, LastNotified>,
}

enum LastNotified {
    Nothing,
    Empty,
    NonEmpty(SelectionChangedParams),
}

impl SelectionTracker {
    pub(crate) fn new() -> Self {
        Self {
            tracked: HashMap::new(),
        }
    }

    /// Start streaming selection changes for a surface. Enabling twice is a
    /// no-op that keeps the existing memory.
    pub(crate) fn enable(&mut self, surface: SurfaceId) {
        self.tracked.entry(surface).or_insert(LastNotified::Nothing);
    }

    /// Stop streaming for a surface. Returns the final empty-selection
    /// notification to send if and only if the last one sent was non-empty.
    pub(crate) fn disable(&mut self, surface: SurfaceId) -> Option<SelectionChangedParams> {
        match self.tracked.remove(&surface)? {
            LastNotified::NonEmpty(last) => Some(SelectionChangedParams {
                text: String::new(),
                file_path: last.file_path,
                file_url: last.file_url,
                selection: SelectionSpan {
                    start: last.selection.end,
                    end: last.selection.end,
                    is_empty: true,
                },
            }),
            LastNotified::Nothing | LastNotified::Empty => None,
        }
    }

    /// The surface was destroyed; forget it without a final notification.
    pub(crate) fn surface_closed(&mut self, surface: SurfaceId) {
        self.tracked.remove(&surface);
    }

    /// Forget every tracked surface. Used at server stop, where there is no
    /// one left to notify.
    pub(crate) fn clear(&mut self) {
        self.tracked.clear();
    }

    /// Record a motion event. Returns the notification params to broadcast,
    /// or `None` when the surface is not tracked.
    pub(crate) fn note_selection(
        &mut self,
        surface: SurfaceId,
        snapshot: &SelectionSnapshot,
    ) -> Option<SelectionChangedParams> {
        let memory = self.tracked.get_mut(&surface)?;
        let params = selection_params(snapshot);
        *memory = if params.selection.is_empty {
            LastNotified::Empty
        } else {
            LastNotified::NonEmpty(params.clone())
        };
        Some(params)
    }
}
