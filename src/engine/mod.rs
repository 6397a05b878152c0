//! Embedded version-control engine contract.
//!
//! The subsystem treats the engine as a black box behind the [`Engine`]
//! trait: repository state in, status/diff/commit/log/tag primitives out.
//! The services never name a concrete engine; the libgit2-backed
//! implementation lives in [`git`] and is the only module allowed to
//! import `git2`.

pub mod git;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use git::GitEngine;

/// Commit or tag author identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Identity used when the caller does not supply one.
    pub fn default_committer() -> Self {
        Self::new("ReqTrace User", "user@reqtrace.local")
    }

    /// Fixed identity for baseline tags.
    pub fn baseline_tagger() -> Self {
        Self::new("ReqTrace Baseline", "baseline@reqtrace.local")
    }
}

/// A single commit as surfaced to callers. Engine timestamps are seconds;
/// they are normalized to milliseconds here, at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp_ms: i64,
}

/// Working-status classification of one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    /// Present on disk, unknown to the engine.
    New,
    /// Staged for the next commit.
    Added,
    Modified,
    Deleted,
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileState::New => "new",
            FileState::Added => "added",
            FileState::Modified => "modified",
            FileState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// One working-status entry. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub path: String,
    pub state: FileState,
}

/// Result of a pull: either a clean fast-forward or a merge that needs
/// caller-side resolution of the listed paths. Never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullOutcome {
    pub success: bool,
    pub conflicts: Vec<String>,
}

impl PullOutcome {
    pub fn clean() -> Self {
        Self {
            success: true,
            conflicts: Vec::new(),
        }
    }

    pub fn conflicted(conflicts: Vec<String>) -> Self {
        Self {
            success: false,
            conflicts,
        }
    }
}

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInfo {
    pub name: String,
    pub url: String,
}

/// Password-style credential injected into remote transports.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub token: String,
}

impl Credential {
    /// Fixed placeholder username; hosting providers ignore it when a
    /// token is supplied as the password.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            username: "x-access-token".to_string(),
            token: token.into(),
        }
    }
}

/// Resolved view of one tag. `annotation` is `None` for lightweight tags,
/// which carry no tag object of their own.
#[derive(Debug, Clone)]
pub struct TagRef {
    pub name: String,
    pub commit_hash: String,
    pub annotation: Option<TagAnnotation>,
}

/// Message and timestamp read from an annotated tag object.
#[derive(Debug, Clone)]
pub struct TagAnnotation {
    pub message: String,
    pub timestamp_ms: i64,
}

/// Primitives the subsystem requires from the embedded engine.
pub trait Engine: Send + Sync {
    // -- staging and committing --
    fn stage_add(&self, path: &str) -> Result<()>;
    fn stage_remove(&self, path: &str) -> Result<()>;
    /// Commit the index; returns the new commit hash.
    fn commit(&self, message: &str, author: &Author) -> Result<String>;

    // -- working-tree state --
    fn status_entries(&self) -> Result<Vec<StatusEntry>>;
    fn is_tracked(&self, path: &str) -> Result<bool>;
    /// Restore one tracked path from HEAD into the working tree and index.
    fn checkout_file(&self, path: &str) -> Result<()>;

    // -- history --
    /// Newest-first commits reachable from `reference`, at most `depth`.
    fn log(&self, reference: &str, depth: usize) -> Result<Vec<CommitInfo>>;
    fn commit_details(&self, hash: &str) -> Result<CommitInfo>;
    fn parent_of(&self, hash: &str) -> Result<Option<String>>;
    fn list_files(&self, reference: &str) -> Result<Vec<String>>;
    /// `(path, blob_id)` pairs of every file in the tree at `reference`.
    fn tree_entries(&self, reference: &str) -> Result<Vec<(String, String)>>;
    /// Blob content at a commit; `None` when the path did not exist there.
    fn read_blob(&self, reference: &str, path: &str) -> Result<Option<Vec<u8>>>;

    // -- refs --
    /// Resolve a reference to a commit hash, `None` when it does not exist.
    fn resolve_ref(&self, reference: &str) -> Result<Option<String>>;
    fn is_descendant(&self, descendant: &str, ancestor: &str) -> Result<bool>;
    /// Commits reachable from `tip` but not from `exclude`, newest first.
    fn commits_between(&self, tip: &str, exclude: &str) -> Result<Vec<CommitInfo>>;
    fn current_branch(&self) -> Result<String>;
    fn head_commit(&self) -> Result<Option<String>>;
    fn head_detached(&self) -> Result<bool>;
    /// Point `branch` at the current HEAD commit and re-attach HEAD to it
    /// symbolically.
    fn attach_head(&self, branch: &str) -> Result<()>;

    // -- remotes and transport --
    /// Add or update a remote (last write wins on the URL).
    fn add_remote(&self, name: &str, url: &str) -> Result<()>;
    fn remove_remote(&self, name: &str) -> Result<()>;
    fn list_remotes(&self) -> Result<Vec<RemoteInfo>>;
    fn fetch(&self, remote: &str, credential: &Credential) -> Result<()>;
    fn push(&self, remote: &str, branch: &str, credential: &Credential) -> Result<()>;
    fn pull(&self, remote: &str, branch: &str, credential: &Credential) -> Result<PullOutcome>;

    // -- tags --
    fn create_annotated_tag(&self, name: &str, message: &str, tagger: &Author) -> Result<()>;
    fn list_tags(&self) -> Result<Vec<String>>;
    fn read_tag(&self, name: &str) -> Result<TagRef>;
}
