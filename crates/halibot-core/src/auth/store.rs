//! Permission store port.
//!
//! The engine never touches the filesystem itself. It reads and writes grant
//! lists through a `PermissionStore`; `halibot-infra` provides the JSON file
//! implementation.
//!
//! Follows the same blanket-impl pattern as `ActorDyn`:
//! 1. Define an object-safe `PermissionStoreDyn` trait with boxed futures
//! 2. Blanket-impl `PermissionStoreDyn` for all `T: PermissionStore`
//! 3. `BoxPermissionStore` wraps `Box<dyn PermissionStoreDyn>` and delegates

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use halibot_types::error::PermissionStoreError;
use halibot_types::permission::Grant;

/// Backing store for the engine's grant list.
pub trait PermissionStore: Send + Sync {
    /// Read the grant list stored at `path`.
    ///
    /// Returns `NotFound` if nothing is stored there and `Parse` if the stored
    /// content is not a list of 3-element string arrays.
    fn read(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Vec<Grant>, PermissionStoreError>> + Send;

    /// Replace whatever is stored at `path` with `grants`.
    fn write(
        &self,
        path: &Path,
        grants: &[Grant],
    ) -> impl Future<Output = Result<(), PermissionStoreError>> + Send;
}

/// Object-safe version of [`PermissionStore`] with boxed futures.
pub trait PermissionStoreDyn: Send + Sync {
    fn read_boxed<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Grant>, PermissionStoreError>> + Send + 'a>>;

    fn write_boxed<'a>(
        &'a self,
        path: &'a Path,
        grants: &'a [Grant],
    ) -> Pin<Box<dyn Future<Output = Result<(), PermissionStoreError>> + Send + 'a>>;
}

impl<T: PermissionStore> PermissionStoreDyn for T {
    fn read_boxed<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Grant>, PermissionStoreError>> + Send + 'a>> {
        Box::pin(self.read(path))
    }

    fn write_boxed<'a>(
        &'a self,
        path: &'a Path,
        grants: &'a [Grant],
    ) -> Pin<Box<dyn Future<Output = Result<(), PermissionStoreError>> + Send + 'a>> {
        Box::pin(self.write(path, grants))
    }
}

/// Type-erased permission store held by the engine.
pub struct BoxPermissionStore {
    inner: Box<dyn PermissionStoreDyn>,
}

impl BoxPermissionStore {
    pub fn new<T: PermissionStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<Grant>, PermissionStoreError> {
        self.inner.read_boxed(path).await
    }

    pub async fn write(&self, path: &Path, grants: &[Grant]) -> Result<(), PermissionStoreError> {
        self.inner.write_boxed(path, grants).await
    }
}

impl std::fmt::Debug for BoxPermissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxPermissionStore").finish_non_exhaustive()
    }
}

/// In-process store that keeps serialized grant lists keyed by path.
///
/// Content is held as JSON text, so parsing behaves exactly like the file
/// store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryPermissionStore {
    documents: Arc<DashMap<PathBuf, String>>,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw text at `path`, bypassing serialization.
    pub fn insert_raw(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.documents.insert(path.into(), content.into());
    }

    /// Raw text stored at `path`, if any.
    pub fn raw(&self, path: &Path) -> Option<String> {
        self.documents.get(path).map(|doc| doc.value().clone())
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.documents.remove(path).is_some()
    }
}

impl PermissionStore for MemoryPermissionStore {
    async fn read(&self, path: &Path) -> Result<Vec<Grant>, PermissionStoreError> {
        let content = self
            .raw(path)
            .ok_or_else(|| PermissionStoreError::NotFound(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|e| PermissionStoreError::Parse(e.to_string()))
    }

    async fn write(&self, path: &Path, grants: &[Grant]) -> Result<(), PermissionStoreError> {
        let content = serde_json::to_string_pretty(grants)
            .map_err(|e| PermissionStoreError::Parse(e.to_string()))?;
        self.documents.insert(path.to_path_buf(), content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = BoxPermissionStore::new(MemoryPermissionStore::new());
        let path = Path::new("perms.json");
        let grants = vec![Grant::new("foo", "bar", "baz"), Grant::new(".*", "root", ".*")];

        store.write(path, &grants).await.unwrap();
        assert_eq!(store.read(path).await.unwrap(), grants);
    }

    #[tokio::test]
    async fn memory_store_missing_path_is_not_found() {
        let store = MemoryPermissionStore::new();
        let err = store.read(Path::new("nope.json")).await.unwrap_err();
        assert!(matches!(err, PermissionStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn memory_store_rejects_non_json_tuples() {
        let store = MemoryPermissionStore::new();
        store.insert_raw("bad.json", r#"[("foo", "bar", "baz")]"#);
        let err = store.read(Path::new("bad.json")).await.unwrap_err();
        assert!(matches!(err, PermissionStoreError::Parse(_)));
    }

    #[tokio::test]
    async fn clones_share_documents() {
        let store = MemoryPermissionStore::new();
        let clone = store.clone();
        clone.insert_raw("shared.json", "[]");
        assert_eq!(store.raw(Path::new("shared.json")).as_deref(), Some("[]"));
        assert!(store.remove(Path::new("shared.json")));
        assert!(clone.raw(Path::new("shared.json")).is_none());
    }
}
