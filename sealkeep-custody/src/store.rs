//! Key file persistence.
//!
//! The custodian only needs existence checks and whole-blob reads and writes;
//! a key file is never patched in place.

use crate::error::{CustodyError, CustodyResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Byte storage for key files, keyed by a filesystem-like name.
#[async_trait]
pub trait KeyFileStore: Send + Sync {
    async fn exists(&self, name: &str) -> CustodyResult<bool>;

    async fn read(&self, name: &str) -> CustodyResult<Vec<u8>>;

    /// Replaces the whole key file.
    async fn write(&self, name: &str, bytes: &[u8]) -> CustodyResult<()>;
}

#[async_trait]
impl<T: KeyFileStore + ?Sized> KeyFileStore for Arc<T> {
    async fn exists(&self, name: &str) -> CustodyResult<bool> {
        (**self).exists(name).await
    }

    async fn read(&self, name: &str) -> CustodyResult<Vec<u8>> {
        (**self).read(name).await
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> CustodyResult<()> {
        (**self).write(name, bytes).await
    }
}

// ── FsKeyFileStore ──────────────────────────────────────────────

/// Key files on the local filesystem.
///
/// Relative names resolve against the store root; absolute names are used
/// as-is. Writes go to a sibling temp file that is then renamed over the
/// target, so readers never observe a partial key file.
#[derive(Clone, Debug)]
pub struct FsKeyFileStore {
    root: PathBuf,
}

impl FsKeyFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> CustodyError {
    CustodyError::Store(format!("{action} {}: {e}", path.display()))
}

#[async_trait]
impl KeyFileStore for FsKeyFileStore {
    async fn exists(&self, name: &str) -> CustodyResult<bool> {
        let path = self.path_for(name);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error("stat", &path, e))
    }

    async fn read(&self, name: &str) -> CustodyResult<Vec<u8>> {
        let path = self.path_for(name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| io_error("read", &path, e))
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> CustodyResult<()> {
        let path = self.path_for(name);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create", parent, e))?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Err(e) = replace_via(&tmp, &path, bytes).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("failed to remove {}: {cleanup}", tmp.display());
                }
            }
            return Err(e);
        }

        debug!("wrote {} byte key file to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// Writes `bytes` to `tmp` (owner-only from creation on Unix), then renames
/// it over `path`.
async fn replace_via(tmp: &Path, path: &Path, bytes: &[u8]) -> CustodyResult<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(tmp)
        .await
        .map_err(|e| io_error("create", tmp, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| io_error("write", tmp, e))?;
    file.sync_all()
        .await
        .map_err(|e| io_error("sync", tmp, e))?;
    drop(file);

    // A stale temp file keeps its old mode.
    restrict_permissions(tmp).await?;
    tokio::fs::rename(tmp, path)
        .await
        .map_err(|e| io_error("rename", path, e))
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> CustodyResult<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| io_error("chmod", path, e))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> CustodyResult<()> {
    Ok(())
}

// ── MemoryKeyFileStore ──────────────────────────────────────────

/// In-memory key files, for tests and for embedding callers that persist
/// the blob themselves.
#[derive(Debug, Default)]
pub struct MemoryKeyFileStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemoryKeyFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current contents of a key file, if any.
    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(name).cloned()
    }

    /// Seeds a key file without counting it as a write.
    pub async fn insert(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.files.write().await.insert(name.into(), bytes);
    }
}

#[async_trait]
impl KeyFileStore for MemoryKeyFileStore {
    async fn exists(&self, name: &str) -> CustodyResult<bool> {
        Ok(self.files.read().await.contains_key(name))
    }

    async fn read(&self, name: &str) -> CustodyResult<Vec<u8>> {
        self.files
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| CustodyError::Store(format!("key file not found: {name}")))
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> CustodyResult<()> {
        self.files.write().await.insert(name.to_string(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryKeyFileStore::new();
        assert!(!store.exists("keys").await.unwrap());

        store.write("keys", b"blob").await.unwrap();
        assert!(store.exists("keys").await.unwrap());
        assert_eq!(store.read("keys").await.unwrap(), b"blob");
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn memory_store_missing_file_is_store_error() {
        let err = MemoryKeyFileStore::new().read("nope").await.unwrap_err();
        assert!(matches!(err, CustodyError::Store(_)));
    }

    #[tokio::test]
    async fn fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyFileStore::new(dir.path());

        assert!(!store.exists("nested/keys.bin").await.unwrap());
        store.write("nested/keys.bin", &[1, 2, 3]).await.unwrap();
        assert!(store.exists("nested/keys.bin").await.unwrap());
        assert_eq!(store.read("nested/keys.bin").await.unwrap(), vec![1, 2, 3]);

        store.write("nested/keys.bin", &[9]).await.unwrap();
        assert_eq!(store.read("nested/keys.bin").await.unwrap(), vec![9]);
        assert!(!dir.path().join("nested/keys.bin.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fs_store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyFileStore::new(dir.path());
        store.write("keys.bin", b"secret").await.unwrap();

        let mode = std::fs::metadata(dir.path().join("keys.bin")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn fs_store_missing_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsKeyFileStore::new(dir.path()).read("absent").await.unwrap_err();
        assert!(matches!(err, CustodyError::Store(_)));
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("keys.bin")).unwrap();
        let store = FsKeyFileStore::new(dir.path());

        let err = store.write("keys.bin", b"x").await.unwrap_err();
        assert!(matches!(err, CustodyError::Store(ref m) if m.contains("rename")));
        assert!(!dir.path().join("keys.bin.tmp").exists());
        assert!(dir.path().join("keys.bin").is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_temp_file_is_replaced_with_owner_only_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("keys.bin.tmp");
        std::fs::write(&stale, b"leftover from a crash").unwrap();
        std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FsKeyFileStore::new(dir.path());
        store.write("keys.bin", b"fresh").await.unwrap();

        assert!(!stale.exists());
        assert_eq!(store.read("keys.bin").await.unwrap(), b"fresh");
        let mode = std::fs::metadata(dir.path().join("keys.bin")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn arc_store_shares_state() {
        let store = Arc::new(MemoryKeyFileStore::new());
        let handle: Arc<MemoryKeyFileStore> = store.clone();
        handle.write("k", b"v").await.unwrap();
        assert_eq!(store.get("k").await, Some(b"v".to_vec()));
    }
}
