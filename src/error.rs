//! Error types for the relay server.

use thiserror::Error;

/// Errors surfaced by the server manager and its collaborators.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `start` called while a listener is already active.
    #[error("server is already running")]
    AlreadyRunning,

    /// `stop` (or a query that requires a live listener) called while stopped.
    #[error("server is not running")]
    NotRunning,

    /// The requested port is taken. Fallback-by-retry is caller policy.
    #[error("port {port} is unavailable")]
    PortUnavailable { port: u16 },

    /// Listener bind failure other than a busy port.
    #[error("failed to bind server: {0}")]
    Bind(String),

    /// Discovery lock file could not be created or removed.
    #[error(transparent)]
    LockFile(#[from] LockFileError),

    /// The editor command channel is closed; the host is shutting down.
    #[error("editor command channel closed")]
    EditorGone,

    /// The editor reported a failure servicing a command.
    #[error("editor error: {0}")]
    Editor(String),
}

/// Errors from discovery lock file management.
#[derive(Debug, Error)]
pub enum LockFileError {
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("lock file I/O error: {0}")]
    Io(String),

    #[error("lock file serialization error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display() {
        assert_eq!(
            format!("{}", ServerError::AlreadyRunning),
            "server is already running"
        );
        assert_eq!(
            format!("{}", ServerError::PortUnavailable { port: 8080 }),
            "port 8080 is unavailable"
        );
    }

    #[test]
    fn lock_file_error_display() {
        let err = LockFileError::NoHomeDir;
        assert_eq!(format!("{err}"), "could not determine home directory");

        let err = LockFileError::Io("test error".to_string());
        assert!(format!("{err}").contains("test error"));
    }

    #[test]
    fn lock_file_error_converts_to_server_error() {
        let err: ServerError = LockFileError::NoHomeDir.into();
        assert!(matches!(err, ServerError::LockFile(_)));
    }
}
