//! Storage backend abstraction layer.
//!
//! Everything above this module (the virtual filesystem, the core, the
//! caches) depends only on the [`StorageBackend`] trait and must behave
//! identically regardless of which implementation is wired in. Two
//! backends are provided: a privileged absolute-path store for
//! desktop-class hosts and a permission-scoped sandboxed store that
//! refuses to step outside its granted root.

mod native;
mod sandbox;

use anyhow::Result;
use std::path::Path;

pub use native::NativeStore;
pub use sandbox::SandboxStore;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Raw storage primitives the subsystem is built on.
///
/// Paths are repository-relative, normalized by [`crate::paths::normalize`]
/// before they reach an implementation. Writes create missing parent
/// directories; reads of absent paths return `None` rather than erroring.
pub trait StorageBackend: Send + Sync {
    /// Read raw bytes, `None` if the path does not exist.
    fn read_binary(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Write raw bytes, creating parent directories as needed.
    fn write_binary(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Write UTF-8 text, creating parent directories as needed.
    fn write_text(&self, path: &str, text: &str) -> Result<()>;

    /// Delete a file. Fails with a not-found error if it does not exist.
    fn delete(&self, path: &str) -> Result<()>;

    /// Create a directory (and any missing parents).
    fn create_dir(&self, path: &str) -> Result<()>;

    /// List immediate entries of a directory. A missing directory lists
    /// as empty rather than failing, matching how artifact folders are
    /// enumerated before their first save.
    fn list_entries(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Whether a directory exists at the path.
    fn directory_exists(&self, path: &str) -> bool;

    /// Opaque identifier of the granted root, for diagnostics only.
    fn root_identifier(&self) -> String;
}

pub(crate) fn read_dir_entries(dir: &Path) -> Result<Vec<DirEntry>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type()?.is_dir();
        entries.push(DirEntry { name, is_dir });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn backends(temp: &TempDir) -> Vec<(&'static str, Arc<dyn StorageBackend>)> {
        vec![
            ("native", Arc::new(NativeStore::new(temp.path()))),
            ("sandbox", Arc::new(SandboxStore::new(temp.path()))),
        ]
    }

    #[test]
    fn test_read_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        for (label, store) in backends(&temp) {
            assert!(
                store.read_binary("missing/file.md").unwrap().is_none(),
                "{label}"
            );
        }
    }

    #[test]
    fn test_write_read_round_trip() {
        let temp = TempDir::new().unwrap();
        for (label, store) in backends(&temp) {
            let path = format!("{label}/requirements/REQ-1.md");
            store.write_text(&path, "# REQ-1").unwrap();
            let bytes = store.read_binary(&path).unwrap().unwrap();
            assert_eq!(bytes, b"# REQ-1", "{label}");
        }
    }

    #[test]
    fn test_write_binary_creates_parents() {
        let temp = TempDir::new().unwrap();
        for (label, store) in backends(&temp) {
            let path = format!("{label}/.git/objects/ab/cdef0123");
            store.write_binary(&path, &[1, 2, 3]).unwrap();
            assert_eq!(store.read_binary(&path).unwrap().unwrap(), vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        for (label, store) in backends(&temp) {
            let err = store.delete("nope.md").unwrap_err();
            assert!(crate::error::VcsError::is_not_found(&err), "{label}");
        }
    }

    #[test]
    fn test_list_entries_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        for (label, store) in backends(&temp) {
            assert!(store.list_entries("nowhere").unwrap().is_empty(), "{label}");
        }
    }

    #[test]
    fn test_list_entries_reports_files_and_dirs() {
        let temp = TempDir::new().unwrap();
        let store = NativeStore::new(temp.path());
        store.write_text("proj/a.md", "a").unwrap();
        store.create_dir("proj/sub").unwrap();

        let entries = store.list_entries("proj").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], DirEntry { name: "a.md".into(), is_dir: false });
        assert_eq!(entries[1], DirEntry { name: "sub".into(), is_dir: true });
    }

    #[test]
    fn test_directory_exists() {
        let temp = TempDir::new().unwrap();
        for (label, store) in backends(&temp) {
            let dir = format!("{label}/requirements");
            assert!(!store.directory_exists(&dir), "{label}");
            store.create_dir(&dir).unwrap();
            assert!(store.directory_exists(&dir), "{label}");
        }
    }

    #[rstest]
    #[case("../outside.md")]
    #[case("a/../../outside.md")]
    #[case("/etc/passwd")]
    fn test_sandbox_rejects_escapes(#[case] path: &str) {
        let temp = TempDir::new().unwrap();
        let store = SandboxStore::new(temp.path());
        assert!(store.write_text(path, "x").is_err(), "path: {path}");
    }

    #[test]
    fn test_native_accepts_dot_segments_within_root() {
        let temp = TempDir::new().unwrap();
        let store = NativeStore::new(temp.path());
        store.write_text("./a.md", "x").unwrap();
        assert!(store.read_binary("a.md").unwrap().is_some());
    }
}
