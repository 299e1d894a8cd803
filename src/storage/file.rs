//! File-backed store: one file per key
//!
//! Writes go to a temporary file that is renamed over the target, so readers
//! never observe a partial value. `compare_and_swap` serialises writers on the
//! same key through a `<key>.lock` file created with `create_new`, which also
//! holds across processes sharing the directory.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::traits::KeyValueStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

const LOCK_ATTEMPTS: usize = 200;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(10);
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

/// Removes the key lock file when dropped
struct KeyLock {
    path: PathBuf,
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                log::warn!("Could not remove lock file {}: {}", self.path.display(), e);
            }
        }
    }
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::io(&root.display().to_string(), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(format!("{}.json", encode_key(key)?)))
    }

    fn lock_path(&self, key: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(format!("{}.lock", encode_key(key)?)))
    }

    async fn read_value(&self, key: &str, path: &Path) -> StorageResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    async fn write_value(&self, key: &str, path: &Path, value: &str) -> StorageResult<()> {
        let temp = path.with_extension(format!(
            "tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&temp, value)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        if let Err(e) = tokio::fs::rename(&temp, path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StorageError::io(key, e));
        }
        Ok(())
    }

    async fn remove_value(&self, key: &str, path: &Path) -> StorageResult<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    async fn lock_key(&self, key: &str) -> StorageResult<KeyLock> {
        let path = self.lock_path(key)?;

        for _ in 0..LOCK_ATTEMPTS {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(KeyLock { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path).await {
                        log::warn!("Removing stale lock file {}", path.display());
                        let _ = tokio::fs::remove_file(&path).await;
                        continue;
                    }
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
                Err(e) => return Err(StorageError::io(key, e)),
            }
        }

        Err(StorageError::Busy {
            key: key.to_string(),
        })
    }
}

async fn lock_is_stale(path: &Path) -> bool {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return false;
    };
    metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}

/// Map a key onto a flat file name: `[A-Za-z0-9_-.]` pass through, everything
/// else becomes `%XX`
fn encode_key(key: &str) -> StorageResult<String> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
        });
    }
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-' | b'.' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    Ok(encoded)
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.value_path(key)?;
        self.read_value(key, &path).await
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        let path = self.value_path(key)?;
        let _lock = self.lock_key(key).await?;
        self.write_value(key, &path, &value).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let path = self.value_path(key)?;
        let _lock = self.lock_key(key).await?;
        self.remove_value(key, &path).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: Option<String>,
    ) -> StorageResult<bool> {
        let path = self.value_path(key)?;
        let _lock = self.lock_key(key).await?;

        let current = self.read_value(key, &path).await?;
        if current.as_deref() != expected {
            return Ok(false);
        }

        match new {
            Some(value) => self.write_value(key, &path, &value).await?,
            None => {
                self.remove_value(key, &path).await?;
            }
        }
        Ok(true)
    }
}
