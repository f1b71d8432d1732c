use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::io::AsyncWriteExt;

/// Abstract persistent key -> blob storage.
///
/// `put` completes only once the write has succeeded or failed; callers
/// decide what a failure means.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
}

/// One file per key under a root directory. Writes go to a temp file that
/// is fsynced and then renamed over the target, so readers never see a torn
/// document.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).with_context(|| format!("create_dir_all {:?}", root))?;
        Ok(Self { root })
    }

    /// Open an existing directory without creating it.
    pub fn open_existing(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            bail!("data directory {:?} does not exist", root);
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            bail!("invalid blob key: {key:?}");
        }
        Ok(self.root.join(key))
    }
}

#[async_trait::async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read blob {:?}", path)),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!(".{key}.tmp"));
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .with_context(|| format!("create {:?}", tmp))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("write blob {:?}", tmp))?;
        file.sync_all()
            .await
            .with_context(|| format!("fsync {:?}", tmp))?;
        drop(file);
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
        Ok(())
    }
}

/// In-process blob store. Writes can be switched to fail.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob, e.g. a document "persisted by a previous run".
    pub fn with_blob(self, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes.into());
        self
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current contents of a blob, without going through the async API.
    pub fn snapshot(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.snapshot(key))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("write to blob {key:?} refused (writes disabled)"));
        }
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes);
        Ok(())
    }
}
