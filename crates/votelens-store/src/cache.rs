//! Content store for downloaded documents, keyed by a relative file name.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::StoreError;

/// Keyed file store for fetched documents.
///
/// Entries live until invalidated. Writers check [`get`](Self::get) before
/// [`put`](Self::put); concurrent puts of the same key are allowed and the
/// last complete write wins.
pub trait DocumentCache: Send + Sync {
    /// Path of the cached entry, if present.
    fn get(&self, key: &str) -> Option<PathBuf>;

    /// Store `bytes` under `key`, replacing any previous entry.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StoreError>;

    /// Remove the entry so that the next lookup misses.
    fn invalidate(&self, key: &str) -> Result<(), StoreError>;
}

/// [`DocumentCache`] backed by a directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `key` is (or would be) stored.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl DocumentCache for DiskCache {
    fn get(&self, key: &str) -> Option<PathBuf> {
        let path = self.path_for(key);
        path.is_file().then_some(path)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.path_for(key);
        let parent = path.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(parent)?;
        // Each writer gets its own temp file; readers never observe a partial entry.
        let mut partial = NamedTempFile::new_in(parent)?;
        partial.write_all(bytes)?;
        partial.persist(&path).map_err(|e| e.error)?;
        debug!(key, bytes = bytes.len(), "cached document");
        Ok(path)
    }

    fn invalidate(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                warn!(key, "invalidated cached document");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn miss_then_hit() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskCache::new(tmp.path());
        assert!(cache.get("20_100.pdf").is_none());

        let path = cache.put("20_100.pdf", b"%PDF-1.7").unwrap();
        assert_eq!(cache.get("20_100.pdf"), Some(path.clone()));
        assert_eq!(fs::read(path).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn put_creates_nested_directories() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskCache::new(tmp.path().join("votes"));
        let path = cache.put("20250129_3/result.pdf", b"x").unwrap();
        assert!(path.ends_with("votes/20250129_3/result.pdf"));
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn concurrent_puts_of_one_key_all_succeed() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let tmp = TempDir::new().unwrap();
        let cache = Arc::new(DiskCache::new(tmp.path()));
        let body = vec![b'%'; 1 << 20];

        for _ in 0..20 {
            let barrier = Arc::new(Barrier::new(4));
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let barrier = Arc::clone(&barrier);
                    let body = body.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        cache.put("20_4711.pdf", &body)
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
            assert_eq!(fs::read(cache.path_for("20_4711.pdf")).unwrap(), body);
            cache.invalidate("20_4711.pdf").unwrap();
        }
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn invalidate_removes_and_tolerates_missing() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskCache::new(tmp.path());
        cache.put("a.pdf", b"x").unwrap();
        cache.invalidate("a.pdf").unwrap();
        assert!(cache.get("a.pdf").is_none());
        cache.invalidate("a.pdf").unwrap();
    }
}
