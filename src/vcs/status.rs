//! Working-tree status: engine comparison merged with an independent
//! artifact-folder enumeration.

use anyhow::Result;
use std::collections::HashSet;
use std::time::Instant;

use super::{StatusCacheEntry, VcsCore, GRACE_WINDOW, STATUS_TTL};
use crate::engine::{FileState, StatusEntry};
use crate::paths::{self, ArtifactKind};

impl VcsCore {
    /// Compute working-tree status, serving a cached result when it is
    /// fresher than the TTL.
    ///
    /// The engine's index/tree comparison misses files its cache has not
    /// yet observed, so every artifact folder is enumerated independently
    /// and unindexed files surface as "new". Paths committed within the
    /// grace window are suppressed to mask the engine racing its own
    /// post-commit index reads.
    pub fn get_status(&self) -> Result<Vec<StatusEntry>> {
        if let Some(cached) = self.status_cache.lock().as_ref() {
            if cached.computed_at.elapsed() < STATUS_TTL {
                return Ok(cached.entries.clone());
            }
        }

        let mut entries = self.engine.status_entries()?;
        // The engine's untracked scan picks up editor droppings too.
        entries.retain(|entry| !paths::is_transient_path(&entry.path));
        let engine_paths: HashSet<String> = entries.iter().map(|e| e.path.clone()).collect();

        // Surface files the engine has not indexed yet, without double
        // counting anything it already reported.
        for kind in ArtifactKind::ALL {
            for entry in self.vfs.backend().list_entries(kind.folder())? {
                if entry.is_dir {
                    continue;
                }
                let names = paths::filter_transient(vec![entry.name]);
                let Some(name) = names.into_iter().next() else {
                    continue;
                };
                let path = format!("{}/{}", kind.folder(), name);
                if !engine_paths.contains(&path) {
                    entries.push(StatusEntry {
                        path,
                        state: FileState::New,
                    });
                }
            }
        }

        self.purge_expired_grace_entries();
        let suppressed = self.recently_committed.lock();
        entries.retain(|entry| !suppressed.contains_key(&entry.path));
        drop(suppressed);

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries.dedup();

        *self.status_cache.lock() = Some(StatusCacheEntry {
            computed_at: Instant::now(),
            entries: entries.clone(),
        });
        Ok(entries)
    }

    fn purge_expired_grace_entries(&self) {
        self.recently_committed
            .lock()
            .retain(|_, committed_at| committed_at.elapsed() < GRACE_WINDOW);
    }
}
