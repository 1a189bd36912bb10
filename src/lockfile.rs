//! Discovery lock file management.
//!
//! Lock files are written to `{lock_dir}/{port}.lock` (by default
//! `~/.claude/ide/{port}.lock`) so an external assistant process can discover
//! the listening port and auth token of a running server without a directory
//! scan.

use std::path::{Path, PathBuf};

use crate::error::LockFileError;
use crate::protocol::LockFileContent;

/// Discovery file handle. Removing is explicit at server stop; `Drop` keeps a
/// best-effort fallback for abnormal exits.
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Default directory for discovery files (`~/.claude/ide`).
    pub fn default_lock_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".claude").join("ide"))
    }

    /// Write the discovery file for the given port.
    pub async fn create(
        lock_dir: Option<&Path>,
        port: u16,
        ide_name: &str,
        workspace_folders: &[PathBuf],
        auth_token: &str,
    ) -> Result<Self, LockFileError> {
        let lock_dir = match lock_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::default_lock_dir().ok_or(LockFileError::NoHomeDir)?,
        };

        tokio::fs::create_dir_all(&lock_dir)
            .await
            .map_err(|e| LockFileError::Io(format!("failed to create lock directory: {e}")))?;

        let lock_path = lock_dir.join(format!("{port}.lock"));

        let content = LockFileContent {
            pid: std::process::id(),
            workspace_folders: workspace_folders
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            ide_name: ide_name.to_string(),
            transport: "ws".to_string(),
            auth_token: auth_token.to_string(),
        };

        let json = serde_json::to_string_pretty(&content)
            .map_err(|e| LockFileError::Serialize(e.to_string()))?;

        tokio::fs::write(&lock_path, json)
            .await
            .map_err(|e| LockFileError::Io(format!("failed to write lock file: {e}")))?;

        Ok(Self { path: lock_path })
    }

    /// Path of the discovery file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the discovery file.
    pub async fn remove(&self) -> Result<(), LockFileError> {
        if self.path.exists() {
            tokio::fs::remove_file(&self.path)
                .await
                .map_err(|e| LockFileError::Io(format!("failed to remove lock file: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Blocking I/O; Drop can't await.
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Generate the per-instance session secret.
pub fn generate_auth_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lock_dir_ends_with_claude_ide() {
        let dir = LockFile::default_lock_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with(".claude/ide"));
    }

    #[test]
    fn auth_token_is_36_chars_and_unique() {
        let a = generate_auth_token();
        let b = generate_auth_token();
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn lock_file_create_writes_descriptor() {
        let temp = tempfile::tempdir().unwrap();
        let token = generate_auth_token();

        let lock = LockFile::create(
            Some(temp.path()),
            43210,
            "coderelay",
            &[PathBuf::from("/test/path")],
            &token,
        )
        .await
        .unwrap();

        assert!(lock.path().ends_with("43210.lock"));
        let raw = tokio::fs::read_to_string(lock.path()).await.unwrap();
        let parsed: LockFileContent = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.pid, std::process::id());
        assert_eq!(parsed.workspace_folders, vec!["/test/path".to_string()]);
        assert_eq!(parsed.ide_name, "coderelay");
        assert_eq!(parsed.transport, "ws");
        assert_eq!(parsed.auth_token, token);
    }

    #[tokio::test]
    async fn lock_file_remove_deletes_file() {
        let temp = tempfile::tempdir().unwrap();

        let lock = LockFile::create(Some(temp.path()), 43211, "coderelay", &[], "t")
            .await
            .unwrap();
        assert!(lock.path().exists());

        lock.remove().await.unwrap();
        assert!(!lock.path().exists());

        // Removing again is a no-op.
        lock.remove().await.unwrap();
    }

    #[tokio::test]
    async fn lock_file_drop_is_best_effort_cleanup() {
        let temp = tempfile::tempdir().unwrap();
        let path;
        {
            let lock = LockFile::create(Some(temp.path()), 43212, "coderelay", &[], "t")
                .await
                .unwrap();
            path = lock.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
