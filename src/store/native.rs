//! Privileged native-path store for desktop-class hosts.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{read_dir_entries, DirEntry, StorageBackend};
use crate::paths;

/// Storage backend rooted at an absolute host directory, reached with full
/// filesystem privileges.
pub struct NativeStore {
    root: PathBuf,
}

impl NativeStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        paths::join_root(&self.root, path)
    }
}

impl StorageBackend for NativeStore {
    fn read_binary(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let target = self.resolve(path);
        match std::fs::read(&target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // Reading a directory as a file also counts as absent content
            Err(_) if target.is_dir() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read '{path}'")),
        }
    }

    fn write_binary(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directory for '{path}'"))?;
        }
        std::fs::write(&target, data).with_context(|| format!("Failed to write '{path}'"))
    }

    fn write_text(&self, path: &str, text: &str) -> Result<()> {
        self.write_binary(path, text.as_bytes())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        std::fs::remove_file(&target).with_context(|| format!("Failed to delete '{path}'"))
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        std::fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create directory '{path}'"))
    }

    fn list_entries(&self, path: &str) -> Result<Vec<DirEntry>> {
        read_dir_entries(&self.resolve(path))
            .with_context(|| format!("Failed to list directory '{path}'"))
    }

    fn directory_exists(&self, path: &str) -> bool {
        self.resolve(path).is_dir()
    }

    fn root_identifier(&self) -> String {
        self.root.display().to_string()
    }
}
