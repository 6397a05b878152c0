//! Repository initialization and metadata repair.
//!
//! Detection probes the engine's head file through the storage backend.
//! A missing or corrupt head file is repaired by writing a minimal valid
//! metadata skeleton; a missing repository is left for the engine to
//! create from scratch. Both paths end with the same layout: artifact
//! folders present, reserved cache folder excluded from status.

use anyhow::Result;

use crate::engine::git::DEFAULT_BRANCH;
use crate::error::VcsError;
use crate::paths::{self, ArtifactKind};
use crate::vfs::Vfs;

const HEAD_PATH: &str = ".git/HEAD";
const EXCLUDE_PATH: &str = ".git/info/exclude";
const DESCRIPTION_PATH: &str = ".git/description";
const CONFIG_PATH: &str = ".git/config";

const MINIMAL_CONFIG: &str =
    "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = false\n";

/// Probe the repository metadata and repair it when the head file is
/// missing or corrupt. Returns true when a repair was performed. A wholly
/// absent repository is not repaired here; the engine initializes it.
pub fn repair_metadata(vfs: &Vfs) -> Result<bool> {
    if !vfs.exists(paths::INTERNAL_DIR) {
        return Ok(false);
    }

    if head_is_valid(vfs)? {
        return Ok(false);
    }

    log::warn!("Repository head file is missing or corrupt, rewriting metadata skeleton");

    vfs.write_file(
        HEAD_PATH,
        format!("ref: refs/heads/{DEFAULT_BRANCH}\n").as_bytes(),
    )?;
    vfs.mkdir(".git/refs/heads")?;
    vfs.mkdir(".git/refs/tags")?;
    vfs.mkdir(".git/objects")?;
    if !vfs.exists(CONFIG_PATH) {
        vfs.write_file(CONFIG_PATH, MINIMAL_CONFIG.as_bytes())?;
    }
    if !vfs.exists(DESCRIPTION_PATH) {
        vfs.write_file(DESCRIPTION_PATH, b"ReqTrace project repository\n")?;
    }
    ensure_exclude(vfs)?;
    Ok(true)
}

fn head_is_valid(vfs: &Vfs) -> Result<bool> {
    let text = match vfs.read_file_utf8(HEAD_PATH) {
        Ok(text) => text,
        Err(e) if VcsError::is_not_found(&e) => return Ok(false),
        // Unreadable head counts as corrupt, not as a hard failure
        Err(e) => {
            log::warn!("Head file unreadable: {e}");
            return Ok(false);
        }
    };

    let trimmed = text.trim();
    let symbolic = trimmed.strip_prefix("ref: ").is_some_and(|r| !r.is_empty());
    let bare_commit = trimmed.len() == 40 && trimmed.bytes().all(|b| b.is_ascii_hexdigit());
    Ok(symbolic || bare_commit)
}

/// Keep the reserved cache folder out of the engine's status results.
pub fn ensure_exclude(vfs: &Vfs) -> Result<()> {
    let wanted = format!("{}/\n", paths::RESERVED_DIR);
    match vfs.read_file_utf8(EXCLUDE_PATH) {
        Ok(existing) if existing.contains(paths::RESERVED_DIR) => Ok(()),
        Ok(existing) => vfs.write_file(EXCLUDE_PATH, format!("{existing}{wanted}").as_bytes()),
        Err(_) => vfs.write_file(EXCLUDE_PATH, wanted.as_bytes()),
    }
}

/// Create the artifact-type folders a project is laid out with.
pub fn ensure_project_layout(vfs: &Vfs) -> Result<()> {
    for kind in ArtifactKind::ALL {
        vfs.mkdir(kind.folder())?;
    }
    Ok(())
}
