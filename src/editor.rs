//! Editor collaborator boundary.
//!
//! The server never touches editor internals. Every host interaction is an
//! [`EditorCommand`] sent over an mpsc channel, carrying a oneshot reply so
//! the caller can await an explicit result. The host adapter owns the other
//! end and services commands from its own event loop.

use tokio::sync::{mpsc, oneshot};

use crate::error::ServerError;
use crate::protocol::{Diagnostic, OpenEditor, Position};

/// Handle to an editable surface in the host editor (e.g. a buffer number).
/// Assigned by the editor; unique for the lifetime of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// A selection/cursor snapshot from the host editor.
#[derive(Debug, Clone)]
pub struct SelectionSnapshot {
    pub file_path: String,
    pub text: String,
    pub start: Position,
    pub end: Position,
}

impl SelectionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Commands sent from the server to the host editor adapter.
#[derive(Debug)]
pub enum EditorCommand {
    /// Materialize a writable diff surface showing `contents` and display it.
    OpenDiffSurface {
        old_path: String,
        new_path: String,
        contents: String,
        tab_name: String,
        reply: oneshot::Sender<Result<SurfaceId, String>>,
    },
    /// Read the surface's current (possibly human-edited) text and clear its
    /// modified flag. `None` if the surface no longer exists.
    SaveSurface {
        surface: SurfaceId,
        reply: oneshot::Sender<Option<String>>,
    },
    /// Destroy a surface. `false` if it was already gone.
    CloseSurface {
        surface: SurfaceId,
        reply: oneshot::Sender<bool>,
    },
    /// Current selection or cursor position, if any.
    CurrentSelection {
        reply: oneshot::Sender<Option<SelectionSnapshot>>,
    },
    /// Open editor surfaces.
    OpenEditors {
        reply: oneshot::Sender<Vec<OpenEditor>>,
    },
    /// Diagnostics, optionally filtered to one document.
    Diagnostics {
        uri: Option<String>,
        reply: oneshot::Sender<Vec<Diagnostic>>,
    },
    /// Navigate to a file, optionally at a specific line.
    OpenFile {
        path: String,
        line: Option<u32>,
        reply: oneshot::Sender<Result<(), String>>,
    },
    /// Evaluate code in the host. Only reachable when the opt-in flag is set.
    ExecuteCode {
        code: String,
        reply: oneshot::Sender<Result<String, String>>,
    },
}

/// Sender half of the editor command channel.
pub type EditorHandle = mpsc::Sender<EditorCommand>;

async fn roundtrip<T>(
    editor: &EditorHandle,
    command: EditorCommand,
    rx: oneshot::Receiver<T>,
) -> Result<T, ServerError> {
    editor
        .send(command)
        .await
        .map_err(|_| ServerError::EditorGone)?;
    rx.await.map_err(|_| ServerError::EditorGone)
}

/// Ask the editor to open a diff surface.
pub async fn open_diff_surface(
    editor: &EditorHandle,
    old_path: &str,
    new_path: &str,
    contents: &str,
    tab_name: &str,
) -> Result<Result<SurfaceId, String>, ServerError> {
    let (reply, rx) = oneshot::channel();
    let cmd = EditorCommand::OpenDiffSurface {
        old_path: old_path.to_string(),
        new_path: new_path.to_string(),
        contents: contents.to_string(),
        tab_name: tab_name.to_string(),
        reply,
    };
    roundtrip(editor, cmd, rx).await
}

/// Read back and save a surface's current text.
pub async fn save_surface(
    editor: &EditorHandle,
    surface: SurfaceId,
) -> Result<Option<String>, ServerError> {
    let (reply, rx) = oneshot::channel();
    roundtrip(editor, EditorCommand::SaveSurface { surface, reply }, rx).await
}

/// Destroy a surface.
pub async fn close_surface(
    editor: &EditorHandle,
    surface: SurfaceId,
) -> Result<bool, ServerError> {
    let (reply, rx) = oneshot::channel();
    roundtrip(editor, EditorCommand::CloseSurface { surface, reply }, rx).await
}

/// Query the current selection.
pub async fn current_selection(
    editor: &EditorHandle,
) -> Result<Option<SelectionSnapshot>, ServerError> {
    let (reply, rx) = oneshot::channel();
    roundtrip(editor, EditorCommand::CurrentSelection { reply }, rx).await
}

/// Query open editors.
pub async fn open_editors(editor: &EditorHandle) -> Result<Vec<OpenEditor>, ServerError> {
    let (reply, rx) = oneshot::channel();
    roundtrip(editor, EditorCommand::OpenEditors { reply }, rx).await
}

/// Query diagnostics.
pub async fn diagnostics(
    editor: &EditorHandle,
    uri: Option<String>,
) -> Result<Vec<Diagnostic>, ServerError> {
    let (reply, rx) = oneshot::channel();
    roundtrip(editor, EditorCommand::Diagnostics { uri, reply }, rx).await
}

/// Navigate to a file.
pub async fn open_file(
    editor: &EditorHandle,
    path: &str,
    line: Option<u32>,
) -> Result<Result<(), String>, ServerError> {
    let (reply, rx) = oneshot::channel();
    let cmd = EditorCommand::OpenFile {
        path: path.to_string(),
        line,
        reply,
    };
    roundtrip(editor, cmd, rx).await
}

/// Evaluate code in the host.
pub async fn execute_code(
    editor: &EditorHandle,
    code: &str,
) -> Result<Result<String, String>, ServerError> {
    let (reply, rx) = oneshot::channel();
    let cmd = EditorCommand::ExecuteCode {
        code: code.to_string(),
        reply,
    };
    roundtrip(editor, cmd, rx).await
}
