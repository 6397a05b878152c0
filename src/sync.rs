//! Local/remote divergence computation and ID-counter reconciliation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::{Author, CommitInfo, Engine};
use crate::paths::ArtifactKind;
use crate::remote::RemoteService;
use crate::vcs::VcsCore;
use crate::vfs::Vfs;

/// Point-in-time comparison between local HEAD and a remote branch ref.
/// Derived, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    pub ahead: bool,
    pub behind: bool,
    pub diverged: bool,
    pub ahead_commits: Vec<CommitInfo>,
    pub behind_commits: Vec<CommitInfo>,
}

pub struct SyncService {
    engine: Arc<dyn Engine>,
    vfs: Arc<Vfs>,
    core: Arc<VcsCore>,
    remote: Arc<RemoteService>,
}

impl SyncService {
    pub fn new(
        engine: Arc<dyn Engine>,
        vfs: Arc<Vfs>,
        core: Arc<VcsCore>,
        remote: Arc<RemoteService>,
    ) -> Self {
        Self {
            engine,
            vfs,
            core,
            remote,
        }
    }

    pub fn current_branch(&self) -> Result<String> {
        self.engine.current_branch()
    }

    /// Classify local HEAD against `refs/remotes/<remote>/<branch>`.
    /// Equal tips mean in-sync; otherwise ancestry in both directions
    /// decides ahead, behind, or diverged (neither direction). Ahead and
    /// behind commit lists walk each side up to, but excluding, the other
    /// side's tip.
    pub fn get_sync_status(&self, remote: &str, branch: Option<&str>) -> Result<SyncStatus> {
        let branch = match branch {
            Some(b) => b.to_string(),
            None => self.engine.current_branch()?,
        };

        let local = self.engine.resolve_ref("HEAD")?;
        let remote_ref = format!("refs/remotes/{remote}/{branch}");
        let remote_tip = self.engine.resolve_ref(&remote_ref)?;

        let (local, remote_tip) = match (local, remote_tip) {
            (Some(l), Some(r)) => (l, r),
            (Some(l), None) => {
                // Nothing known on the remote side: everything local is ahead
                return Ok(SyncStatus {
                    ahead: true,
                    ahead_commits: self.engine.log(&l, 0)?,
                    ..Default::default()
                });
            }
            (None, Some(r)) => {
                return Ok(SyncStatus {
                    behind: true,
                    behind_commits: self.engine.log(&r, 0)?,
                    ..Default::default()
                });
            }
            (None, None) => return Ok(SyncStatus::default()),
        };

        if local == remote_tip {
            return Ok(SyncStatus::default());
        }

        let local_ahead = self.engine.is_descendant(&local, &remote_tip)?;
        let remote_ahead = self.engine.is_descendant(&remote_tip, &local)?;

        let mut status = SyncStatus {
            ahead: local_ahead,
            behind: remote_ahead,
            diverged: !local_ahead && !remote_ahead,
            ..Default::default()
        };

        if local_ahead || status.diverged {
            status.ahead = true;
            status.ahead_commits = self.engine.commits_between(&local, &remote_tip)?;
        }
        if remote_ahead || status.diverged {
            status.behind = true;
            status.behind_commits = self.engine.commits_between(&remote_tip, &local)?;
        }
        Ok(status)
    }

    /// Reconcile ID counters from the remote: fetch, then keep
    /// `max(local, remote)` per counter file. Order-independent and
    /// idempotent; repeated pulls are no-ops. Returns how many counters
    /// were raised.
    pub fn pull_counters(&self, remote: &str) -> Result<usize> {
        if !self.remote.has_remote(remote) {
            log::info!("No remote '{remote}' configured, skipping counter pull");
            return Ok(0);
        }
        self.remote.fetch(remote)?;

        let branch = self.engine.current_branch()?;
        let remote_ref = format!("refs/remotes/{remote}/{branch}");
        let Some(remote_tip) = self.engine.resolve_ref(&remote_ref)? else {
            log::debug!("Remote ref '{remote_ref}' absent, skipping counter pull");
            return Ok(0);
        };
        if self.engine.resolve_ref("HEAD")? == Some(remote_tip.clone()) {
            return Ok(0);
        }

        let mut raised = 0;
        for kind in ArtifactKind::ALL {
            let path = kind.counter_path();
            let Some(remote_value) = self.read_remote_counter(&remote_tip, &path)? else {
                continue;
            };
            let local_value = self.read_local_counter(&path)?;

            if local_value.map_or(true, |local| remote_value > local) {
                self.vfs
                    .write_file(&path, remote_value.to_string().as_bytes())?;
                raised += 1;
                log::debug!(
                    "Counter '{path}' raised to {remote_value} (local was {local_value:?})"
                );
            }
        }
        Ok(raised)
    }

    /// Commit any counter files present on disk as one history entry and
    /// push. Returns false when there was nothing to stage or no remote.
    pub fn push_counters(&self, remote: &str, message: Option<&str>) -> Result<bool> {
        if !self.remote.has_remote(remote) {
            log::info!("No remote '{remote}' configured, skipping counter push");
            return Ok(false);
        }

        let staged = {
            let _serialized = self.core.commit_lock.lock();

            let mut staged = Vec::new();
            for kind in ArtifactKind::ALL {
                let path = kind.counter_path();
                if self.vfs.backend().read_binary(&path)?.is_some() {
                    self.engine.stage_add(&path)?;
                    staged.push(path);
                }
            }

            if !staged.is_empty() {
                self.core.ensure_head_attached()?;
                self.core.finish_commit(
                    staged.clone(),
                    message.unwrap_or("Update ID counters"),
                    &Author::default_committer(),
                )?;
            }
            staged
        };

        if staged.is_empty() {
            return Ok(false);
        }

        let branch = self.engine.current_branch()?;
        self.remote.push(remote, &branch)?;
        Ok(true)
    }

    fn read_local_counter(&self, path: &str) -> Result<Option<u64>> {
        let Some(bytes) = self.vfs.backend().read_binary(path)? else {
            return Ok(None);
        };
        Ok(Some(parse_counter(&bytes, path)?))
    }

    fn read_remote_counter(&self, remote_tip: &str, path: &str) -> Result<Option<u64>> {
        let Some(bytes) = self.engine.read_blob(remote_tip, path)? else {
            return Ok(None);
        };
        Ok(Some(parse_counter(&bytes, path)?))
    }
}

/// Counter files hold a single base-10 integer, surrounding whitespace
/// tolerated.
fn parse_counter(bytes: &[u8], path: &str) -> Result<u64> {
    std::str::from_utf8(bytes)
        .ok()
        .map(str::trim)
        .and_then(|s| s.parse::<u64>().ok())
        .with_context(|| format!("Counter file '{path}' does not hold an integer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_counter_accepts_whitespace() {
        assert_eq!(parse_counter(b" 42\n", "c").unwrap(), 42);
        assert_eq!(parse_counter(b"7", "c").unwrap(), 7);
    }

    #[test]
    fn test_parse_counter_rejects_garbage() {
        assert!(parse_counter(b"x7", "c").is_err());
        assert!(parse_counter(b"", "c").is_err());
        assert!(parse_counter(&[0xff, 0xfe], "c").is_err());
    }
}
