//! Permission-scoped sandboxed store for browser-class hosts.
//!
//! Models a directory handle granted by the host: every path must stay
//! inside the granted root. Parent traversal and absolute paths are
//! refused before any I/O happens, the same way a sandboxed handle would
//! refuse them.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::{read_dir_entries, DirEntry, StorageBackend};
use crate::paths;

/// Storage backend scoped to a granted directory; never reaches outside it.
pub struct SandboxStore {
    root: PathBuf,
}

impl SandboxStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.starts_with('/') && paths::normalize(path).is_empty() {
            return Ok(self.root.clone());
        }
        if Path::new(path).is_absolute() {
            return Err(anyhow!(
                "Path '{path}' is outside the granted directory"
            ));
        }
        let normalized = paths::normalize(path);
        if normalized.split('/').any(|part| part == "..") {
            return Err(anyhow!(
                "Path '{path}' escapes the granted directory"
            ));
        }
        Ok(paths::join_root(&self.root, &normalized))
    }
}

impl StorageBackend for SandboxStore {
    fn read_binary(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let target = self.resolve(path)?;
        match std::fs::read(&target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(_) if target.is_dir() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read '{path}'")),
        }
    }

    fn write_binary(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
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
        let target = self.resolve(path)?;
        std::fs::remove_file(&target).with_context(|| format!("Failed to delete '{path}'"))
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        std::fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create directory '{path}'"))
    }

    fn list_entries(&self, path: &str) -> Result<Vec<DirEntry>> {
        let target = self.resolve(path)?;
        read_dir_entries(&target).with_context(|| format!("Failed to list directory '{path}'"))
    }

    fn directory_exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn root_identifier(&self) -> String {
        format!("sandbox:{}", self.root.display())
    }
}
