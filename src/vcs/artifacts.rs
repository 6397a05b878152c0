//! Artifact file persistence. Saving and deleting only touch the disk;
//! recording in history is a separate, explicit commit so callers can
//! batch edits.

use anyhow::Result;

use super::VcsCore;
use crate::paths::{artifact_path, ArtifactKind};

impl VcsCore {
    /// Write an artifact file at its deterministic path. No commit.
    /// Returns the repository-relative path written.
    pub fn save_artifact(&self, kind: ArtifactKind, id: &str, data: &str) -> Result<String> {
        let path = artifact_path(kind, id);
        self.vfs.write_file(&path, data.as_bytes())?;
        self.invalidate_status_cache();
        Ok(path)
    }

    /// Remove an artifact file from disk. No commit. Returns the
    /// repository-relative path removed.
    pub fn delete_artifact(&self, kind: ArtifactKind, id: &str) -> Result<String> {
        let path = artifact_path(kind, id);
        self.vfs.unlink(&path)?;
        self.invalidate_status_cache();
        Ok(path)
    }
}
