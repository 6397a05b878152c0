//! Serialized commit pipeline.
//!
//! Every history mutation funnels through the core's fair commit lock, so
//! concurrent callers produce a strictly ordered sequence of commits
//! instead of racing on the engine's index. A caller's commit completes
//! only after every commit that acquired the lock before it.

use anyhow::Result;

use super::VcsCore;
use crate::engine::git::DEFAULT_BRANCH;
use crate::engine::Author;
use crate::paths;

impl VcsCore {
    /// Commit a single path. The target's presence on the backend decides
    /// the staging direction: present stages as add/modify, absent stages
    /// as removal.
    pub fn commit_file(
        &self,
        path: &str,
        message: &str,
        author: Option<Author>,
    ) -> Result<String> {
        let path = paths::normalize(path);
        let _serialized = self.commit_lock.lock();

        let exists = self.vfs.backend().read_binary(&path)?.is_some();
        self.ensure_head_attached()?;
        if exists {
            self.engine.stage_add(&path)?;
        } else {
            self.engine.stage_remove(&path)?;
        }

        let author = author.unwrap_or_else(Author::default_committer);
        self.finish_commit(vec![path], message, &author)
    }

    /// Replace `old_path` with `new_path` carrying `new_content`, recorded
    /// as a single history entry, never two commits.
    pub fn rename_file(
        &self,
        old_path: &str,
        new_path: &str,
        new_content: &str,
        message: Option<&str>,
    ) -> Result<String> {
        let old_path = paths::normalize(old_path);
        let new_path = paths::normalize(new_path);
        let _serialized = self.commit_lock.lock();

        self.vfs.write_file(&new_path, new_content.as_bytes())?;
        if self.vfs.backend().read_binary(&old_path)?.is_some() {
            self.vfs.backend().delete(&old_path)?;
        }

        self.ensure_head_attached()?;
        self.engine.stage_remove(&old_path)?;
        self.engine.stage_add(&new_path)?;

        let default_message = format!("Rename {old_path} to {new_path}");
        let message = message.unwrap_or(&default_message);
        self.finish_commit(
            vec![old_path, new_path],
            message,
            &Author::default_committer(),
        )
    }

    /// Commit whatever is staged, then run the post-commit bookkeeping for
    /// `paths`: grace-window markers, status-cache invalidation, and
    /// seeding the commit-file cache (a known path set needs no tree
    /// diff). Callers must hold the commit lock.
    pub(crate) fn finish_commit(
        &self,
        paths: Vec<String>,
        message: &str,
        author: &Author,
    ) -> Result<String> {
        let hash = self.engine.commit(message, author)?;

        for path in &paths {
            self.mark_recently_committed(path);
        }
        self.invalidate_status_cache();
        if let Err(e) = self.commit_cache.insert(&hash, paths) {
            log::warn!("Failed to seed commit-file cache for {hash}: {e}");
        }

        log::debug!("Committed {hash}: {message}");
        Ok(hash)
    }

    /// Restore a path to its committed state: untracked files are deleted,
    /// tracked files are checked out from head, and a path that is neither
    /// tracked nor present is a silent no-op.
    pub fn revert_file(&self, path: &str) -> Result<()> {
        let path = paths::normalize(path);
        let tracked = self.engine.is_tracked(&path)?;
        let present = self.vfs.backend().read_binary(&path)?.is_some();

        if tracked {
            self.engine.checkout_file(&path)?;
        } else if present {
            self.vfs.backend().delete(&path)?;
        } else {
            return Ok(());
        }
        self.invalidate_status_cache();
        Ok(())
    }

    /// Once per session, verify HEAD is a symbolic branch reference and
    /// repair it when detached. Committing while detached would silently
    /// fail to advance any branch.
    pub(crate) fn ensure_head_attached(&self) -> Result<()> {
        if !self.session.claim_head_check() {
            return Ok(());
        }
        if self.engine.head_detached()? {
            log::warn!("HEAD is detached, re-attaching to '{DEFAULT_BRANCH}'");
            self.engine.attach_head(DEFAULT_BRANCH)?;
        }
        Ok(())
    }
}
