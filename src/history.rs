//! Commit history traversal, per-commit changed-file computation, and
//! point-in-time project reconstruction.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::CommitFileCache;
use crate::engine::{CommitInfo, Engine};
use crate::paths::{self, ArtifactKind};

/// One artifact as it existed at a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSnapshot {
    pub kind: ArtifactKind,
    pub id: String,
    pub path: String,
    pub content: String,
}

/// Complete project state reconstructed at a commit. Built purely from
/// history reads; the working tree is never touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub commit_hash: String,
    pub artifacts: Vec<ArtifactSnapshot>,
}

pub struct HistoryService {
    engine: Arc<dyn Engine>,
    cache: Arc<CommitFileCache>,
}

impl HistoryService {
    pub fn new(engine: Arc<dyn Engine>, cache: Arc<CommitFileCache>) -> Self {
        Self { engine, cache }
    }

    /// Newest-first commits reachable from `reference`, bounded by `depth`
    /// (0 means unbounded), optionally restricted to commits whose
    /// changed-file set contains `path`.
    pub fn get_history(
        &self,
        path: Option<&str>,
        depth: usize,
        reference: &str,
    ) -> Result<Vec<CommitInfo>> {
        let Some(path) = path else {
            return self.engine.log(reference, depth);
        };
        let path = paths::normalize(path);

        let mut matching = Vec::new();
        for commit in self.engine.log(reference, 0)? {
            if self.get_commit_files(&commit.hash)?.contains(&path) {
                matching.push(commit);
                if depth > 0 && matching.len() >= depth {
                    break;
                }
            }
        }
        Ok(matching)
    }

    /// Changed-file set of a commit: the paths of the symmetric difference
    /// between its `(path, blob)` tree entries and its parent's. A commit
    /// with no parent changes every file it contains. Results are cached
    /// by hash and mirrored to disk; commit contents are immutable, so a
    /// cached answer is final.
    pub fn get_commit_files(&self, hash: &str) -> Result<Vec<String>> {
        self.cache.load_once()?;
        if let Some(files) = self.cache.get(hash) {
            return Ok(files);
        }

        let current: HashSet<(String, String)> =
            self.engine.tree_entries(hash)?.into_iter().collect();

        let changed: Vec<String> = match self.engine.parent_of(hash)? {
            None => current.into_iter().map(|(path, _)| path).collect(),
            Some(parent) => {
                let previous: HashSet<(String, String)> =
                    self.engine.tree_entries(&parent)?.into_iter().collect();
                current
                    .symmetric_difference(&previous)
                    .map(|(path, _)| path.clone())
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect()
            }
        };

        let mut changed = changed;
        changed.sort();
        self.cache.insert(hash, changed.clone())?;
        Ok(changed)
    }

    /// File content at a commit, decoded as text. `None` when the path did
    /// not exist at that commit; any other failure propagates.
    pub fn read_file_at_commit(&self, path: &str, hash: &str) -> Result<Option<String>> {
        let path = paths::normalize(path);
        match self.engine.read_blob(hash, &path)? {
            Some(bytes) => {
                let text = String::from_utf8(bytes)
                    .with_context(|| format!("'{path}' at {hash} is not valid UTF-8"))?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    /// Every file path present in the tree at a commit.
    pub fn list_files_at_commit(&self, hash: &str) -> Result<Vec<String>> {
        self.engine.list_files(hash)
    }

    /// Reconstruct the whole project as of a commit: list the tree,
    /// partition by artifact folder, decode each artifact. Files outside
    /// the artifact folders (counters, metadata) are skipped.
    pub fn load_project_snapshot(&self, hash: &str) -> Result<ProjectSnapshot> {
        let mut artifacts = Vec::new();

        for path in self.engine.list_files(hash)? {
            let Some((folder, file)) = path.split_once('/') else {
                continue;
            };
            let Some(kind) = ArtifactKind::from_folder(folder) else {
                continue;
            };
            let Some(id) = file.strip_suffix(".md") else {
                continue;
            };
            if id.contains('/') {
                continue; // artifacts live directly in their folder
            }

            let Some(content) = self.read_file_at_commit(&path, hash)? else {
                continue;
            };
            artifacts.push(ArtifactSnapshot {
                kind,
                id: id.to_string(),
                path,
                content,
            });
        }

        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(ProjectSnapshot {
            commit_hash: hash.to_string(),
            artifacts,
        })
    }
}
