//! Disk-mirrored cache of per-commit changed-file lists.
//!
//! Commit contents are immutable, so the cache is append-only: a hash maps
//! to the same path list forever. The in-memory map is authoritative; the
//! on-disk mirror is a flat JSON object at a reserved path inside the
//! working directory, loaded once per session and rewritten in full on
//! every insert so it survives process restarts.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::VcsError;
use crate::paths;
use crate::vfs::Vfs;

/// Reserved path of the on-disk mirror, relative to the working directory.
pub const CACHE_DOC_PATH: &str = ".reqtrace/commit-files.json";

struct Inner {
    loaded: bool,
    map: HashMap<String, Vec<String>>,
}

pub struct CommitFileCache {
    vfs: Arc<Vfs>,
    inner: Mutex<Inner>,
}

impl CommitFileCache {
    pub fn new(vfs: Arc<Vfs>) -> Self {
        Self {
            vfs,
            inner: Mutex::new(Inner {
                loaded: false,
                map: HashMap::new(),
            }),
        }
    }

    /// Load the disk mirror into memory if it has not been loaded yet.
    /// Absent or malformed documents are treated as empty, never an error.
    pub fn load_once(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.loaded {
            return Ok(());
        }

        match self.vfs.read_file_utf8(CACHE_DOC_PATH) {
            Ok(text) => match serde_json::from_str::<HashMap<String, Vec<String>>>(&text) {
                Ok(map) => inner.map = map,
                Err(e) => {
                    log::warn!("Commit-file cache document is malformed, starting empty: {e}");
                }
            },
            Err(e) if VcsError::is_not_found(&e) => {}
            Err(e) => {
                log::warn!("Failed to read commit-file cache document, starting empty: {e}");
            }
        }
        inner.loaded = true;
        Ok(())
    }

    pub fn get(&self, hash: &str) -> Option<Vec<String>> {
        self.inner.lock().map.get(hash).cloned()
    }

    /// Record the changed-file list of a commit and flush the mirror.
    /// Inserting the same hash twice is a no-op by construction.
    pub fn insert(&self, hash: &str, mut files: Vec<String>) -> Result<()> {
        files.sort();
        let snapshot = {
            let mut inner = self.inner.lock();
            inner.map.insert(hash.to_string(), files);
            inner.map.clone()
        };
        self.write_mirror(&snapshot)
    }

    /// Rewrite the disk mirror from the in-memory map.
    pub fn flush(&self) -> Result<()> {
        let snapshot = self.inner.lock().map.clone();
        self.write_mirror(&snapshot)
    }

    fn write_mirror(&self, map: &HashMap<String, Vec<String>>) -> Result<()> {
        let doc = serde_json::to_string(map).context("Failed to serialize commit-file cache")?;
        // Ensure the reserved folder exists before the full rewrite
        self.vfs.mkdir(paths::RESERVED_DIR)?;
        self.vfs.write_file(CACHE_DOC_PATH, doc.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NativeStore;
    use tempfile::TempDir;

    fn cache(temp: &TempDir) -> CommitFileCache {
        let vfs = Arc::new(Vfs::new(Arc::new(NativeStore::new(temp.path()))));
        CommitFileCache::new(vfs)
    }

    #[test]
    fn test_absent_document_loads_empty() {
        let temp = TempDir::new().unwrap();
        let c = cache(&temp);
        c.load_once().unwrap();
        assert!(c.get("deadbeef").is_none());
    }

    #[test]
    fn test_malformed_document_loads_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".reqtrace")).unwrap();
        std::fs::write(temp.path().join(CACHE_DOC_PATH), "{not json").unwrap();

        let c = cache(&temp);
        c.load_once().unwrap();
        assert!(c.get("deadbeef").is_none());
    }

    #[test]
    fn test_insert_survives_reload() {
        let temp = TempDir::new().unwrap();
        {
            let c = cache(&temp);
            c.load_once().unwrap();
            c.insert("abc123", vec!["requirements/REQ-1.md".into()])
                .unwrap();
        }

        let c = cache(&temp);
        c.load_once().unwrap();
        assert_eq!(
            c.get("abc123"),
            Some(vec!["requirements/REQ-1.md".to_string()])
        );
    }

    #[test]
    fn test_insert_sorts_paths() {
        let temp = TempDir::new().unwrap();
        let c = cache(&temp);
        c.load_once().unwrap();
        c.insert("h", vec!["b.md".into(), "a.md".into()]).unwrap();
        assert_eq!(c.get("h"), Some(vec!["a.md".to_string(), "b.md".to_string()]));
    }

    #[test]
    fn test_load_once_does_not_clobber_memory() {
        let temp = TempDir::new().unwrap();
        let c = cache(&temp);
        c.load_once().unwrap();
        c.insert("h", vec!["a.md".into()]).unwrap();
        // A second load is a no-op
        c.load_once().unwrap();
        assert!(c.get("h").is_some());
    }
}
