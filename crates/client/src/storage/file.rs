//! File-backed token storage.
//!
//! Responsibilities:
//! - Persist the current token as a single owner-only JSON record.
//! - Atomic writes (temp file + rename) so readers never observe a
//!   half-written record.
//!
//! Does NOT handle:
//! - Path selection (see `garmin_config::default_token_path`).
//!
//! Invariants:
//! - A missing or unparsable record is "no session", not a corrupt-format
//!   error.
//! - I/O failures are always surfaced as `Storage` errors.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::token::Token;

use super::TokenStorage;

/// Token storage persisted as a restrictive-permission file.
///
/// Concurrent readers/writers are coordinated through a read/write lock;
/// the on-disk replacement itself is a rename, so even an interrupted
/// store never leaves a partial record behind.
#[derive(Debug)]
pub struct FileTokenStorage {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileTokenStorage {
    /// Create a storage backend at the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// The path of the persisted token record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> ClientError {
        ClientError::Storage {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn get(&self) -> Result<Option<Token>> {
        let _guard = self.lock.read().await;

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };

        match serde_json::from_str::<Token>(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                // Incomplete or legacy records are treated as no session
                // rather than failing every subsequent call.
                warn!(path = %self.path.display(), error = %e, "Unreadable token record, treating as no session");
                Ok(None)
            }
        }
    }

    async fn store(&self, token: &Token) -> Result<()> {
        let _guard = self.lock.write().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_err(e))?;
        }

        let content =
            serde_json::to_string_pretty(token).map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        // Write to a temporary file first, then rename over the target so
        // readers never see a partially written record.
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| self.io_err(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_err(e))?;
        }

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.io_err(e))?;

        debug!(path = %self.path.display(), "Token saved atomically");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.write().await;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample_token() -> Token {
        Token {
            access_token: "AT-1".to_string(),
            refresh_token: "RT-1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            domain: "garmin.com".to_string(),
            profile: None,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("tokens.json"));
        assert!(storage.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("tokens.json"));

        storage.store(&sample_token()).await.unwrap();
        let token = storage.get().await.unwrap().unwrap();
        assert_eq!(token.access_token, "AT-1");
        assert_eq!(token.domain, "garmin.com");
    }

    #[tokio::test]
    async fn test_store_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("nested/dir/tokens.json"));

        storage.store(&sample_token()).await.unwrap();
        assert!(storage.get().await.unwrap().is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_has_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let storage = FileTokenStorage::new(&path);

        storage.store(&sample_token()).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "{\"access_token\": \"truncated").unwrap();

        let storage = FileTokenStorage::new(&path);
        assert!(storage.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_record_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let storage = FileTokenStorage::new(&path);

        storage.store(&sample_token()).await.unwrap();
        storage.clear().await.unwrap();
        assert!(!path.exists());

        // Clearing an already-empty slot is fine.
        storage.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_temp_file_never_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        // Leftover from an interrupted write that died before the rename.
        std::fs::write(path.with_extension("tmp"), "{\"access_token\": \"AT-par").unwrap();

        let storage = FileTokenStorage::new(&path);
        assert!(storage.get().await.unwrap().is_none());

        storage.store(&sample_token()).await.unwrap();
        let token = storage.get().await.unwrap().unwrap();
        assert_eq!(token.access_token, "AT-1");
        assert_eq!(token.refresh_token, "RT-1");

        // The rename consumed the temp file; only the complete record
        // remains.
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_store_replaces_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("tokens.json"));

        storage.store(&sample_token()).await.unwrap();
        let mut replacement = sample_token();
        replacement.access_token = "AT-2".to_string();
        storage.store(&replacement).await.unwrap();

        let token = storage.get().await.unwrap().unwrap();
        assert_eq!(token.access_token, "AT-2");
    }
}
