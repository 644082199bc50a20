//! JSON file permission store.
//!
//! Implements the `PermissionStore` trait from `halibot-core`. The file holds
//! a JSON array of 3-element string arrays:
//!
//! ```text
//! [
//!   ["irc/#ops", "alice", "Kick"],
//!   [".*", "root", ".*"]
//! ]
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use halibot_core::auth::PermissionStore;
use halibot_types::error::PermissionStoreError;
use halibot_types::permission::Grant;
use tokio::io::AsyncWriteExt;

/// File-backed permission store. All I/O goes through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFilePermissionStore;

impl JsonFilePermissionStore {
    pub fn new() -> Self {
        Self
    }
}

impl PermissionStore for JsonFilePermissionStore {
    async fn read(&self, path: &Path) -> Result<Vec<Grant>, PermissionStoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PermissionStoreError::NotFound(path.to_path_buf()));
            }
            Err(err) => return Err(PermissionStoreError::Io(err.to_string())),
        };

        serde_json::from_str(&content).map_err(|e| PermissionStoreError::Parse(e.to_string()))
    }

    async fn write(&self, path: &Path, grants: &[Grant]) -> Result<(), PermissionStoreError> {
        let content = serde_json::to_string_pretty(grants)
            .map_err(|e| PermissionStoreError::Parse(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PermissionStoreError::Io(e.to_string()))?;
        }

        // Written to a sibling and renamed, so the target is never partial.
        let tmp_path = sibling_tmp_path(path)?;
        if let Err(err) = write_synced(&tmp_path, content.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(PermissionStoreError::Io(err.to_string()));
        }
        if let Err(err) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(PermissionStoreError::Io(err.to_string()));
        }

        tracing::debug!(path = %path.display(), grants = grants.len(), "permission file written");
        Ok(())
    }
}

/// `dir/.name.tmp` for a target `dir/name`.
fn sibling_tmp_path(path: &Path) -> Result<PathBuf, PermissionStoreError> {
    let file_name = path.file_name().ok_or_else(|| {
        PermissionStoreError::Io(format!("{} does not name a file", path.display()))
    })?;
    let mut tmp_name = OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

async fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}
