//! libgit2-backed engine implementation.
//!
//! `git2::Repository` is `Send` but not `Sync`, so the handle lives behind
//! a mutex; every primitive takes the lock for its full duration. Commit
//! serialization above this layer is handled by the core's commit lock,
//! not here.

use anyhow::{anyhow, Context, Result};
use git2::{ErrorCode, ObjectType, Repository, RepositoryInitOptions, Signature, StatusOptions};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use super::{
    Author, CommitInfo, Credential, Engine, FileState, PullOutcome, RemoteInfo, StatusEntry,
    TagAnnotation, TagRef,
};

/// Branch used when (re)creating repository metadata.
pub const DEFAULT_BRANCH: &str = "main";

pub struct GitEngine {
    repo: Mutex<Repository>,
    workdir: PathBuf,
}

impl GitEngine {
    /// Open an existing repository, or initialize one with the default
    /// branch when no metadata is present.
    pub fn open_or_init(workdir: &Path) -> Result<Self> {
        let repo = if workdir.join(".git").exists() {
            Repository::open(workdir)
                .with_context(|| format!("Failed to open repository at {}", workdir.display()))?
        } else {
            let mut opts = RepositoryInitOptions::new();
            opts.initial_head(DEFAULT_BRANCH);
            Repository::init_opts(workdir, &opts).with_context(|| {
                format!("Failed to initialize repository at {}", workdir.display())
            })?
        };

        Ok(Self {
            repo: Mutex::new(repo),
            workdir: workdir.to_path_buf(),
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn signature(author: &Author) -> Result<Signature<'static>> {
        Signature::now(&author.name, &author.email).context("Failed to create signature")
    }

    fn commit_oid(repo: &Repository, reference: &str) -> Result<git2::Oid> {
        let obj = repo
            .revparse_single(reference)
            .with_context(|| format!("Failed to resolve '{reference}'"))?;
        Ok(obj
            .peel_to_commit()
            .with_context(|| format!("'{reference}' does not point to a commit"))?
            .id())
    }

    fn commit_to_info(commit: &git2::Commit) -> CommitInfo {
        CommitInfo {
            hash: commit.id().to_string(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: commit.author().name().unwrap_or("").to_string(),
            author_email: commit.author().email().unwrap_or("").to_string(),
            // Engine timestamps are seconds; callers get milliseconds
            timestamp_ms: commit.time().seconds() * 1000,
        }
    }

    fn collect_walk(
        repo: &Repository,
        tip: git2::Oid,
        exclude: Option<git2::Oid>,
        depth: usize,
    ) -> Result<Vec<CommitInfo>> {
        let mut walk = repo.revwalk().context("Failed to create revwalk")?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        walk.push(tip)?;
        if let Some(hide) = exclude {
            walk.hide(hide)?;
        }

        let mut commits = Vec::new();
        for oid in walk {
            if depth > 0 && commits.len() >= depth {
                break;
            }
            let oid = oid?;
            let commit = repo.find_commit(oid)?;
            commits.push(Self::commit_to_info(&commit));
        }
        Ok(commits)
    }

    fn empty_tree(repo: &Repository) -> Result<git2::Oid> {
        Ok(repo.treebuilder(None)?.write()?)
    }

    fn remote_callbacks(credential: &Credential) -> git2::RemoteCallbacks<'_> {
        let mut callbacks = git2::RemoteCallbacks::new();
        let username = credential.username.clone();
        let token = credential.token.clone();
        callbacks.credentials(move |_url, _username_from_url, _allowed| {
            git2::Cred::userpass_plaintext(&username, &token)
        });
        callbacks
    }
}

impl Engine for GitEngine {
    fn stage_add(&self, path: &str) -> Result<()> {
        let repo = self.repo.lock();
        let mut index = repo.index().context("Failed to get repository index")?;
        index
            .add_path(Path::new(path))
            .with_context(|| format!("Failed to stage '{path}'"))?;
        index.write().context("Failed to write index")?;
        Ok(())
    }

    fn stage_remove(&self, path: &str) -> Result<()> {
        let repo = self.repo.lock();
        let mut index = repo.index().context("Failed to get repository index")?;
        index
            .remove_path(Path::new(path))
            .with_context(|| format!("Failed to stage removal of '{path}'"))?;
        index.write().context("Failed to write index")?;
        Ok(())
    }

    fn commit(&self, message: &str, author: &Author) -> Result<String> {
        let repo = self.repo.lock();
        let mut index = repo.index().context("Failed to get repository index")?;
        let tree_oid = index.write_tree().context("Failed to write tree")?;
        let tree = repo.find_tree(tree_oid).context("Failed to find tree")?;

        let signature = Self::signature(author)?;

        let parent_commit = match repo.head() {
            Ok(head) => {
                let oid = head.target().context("Failed to get HEAD target")?;
                Some(
                    repo.find_commit(oid)
                        .context("Failed to find parent commit")?,
                )
            }
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None // first commit
            }
            Err(e) => return Err(e).context("Failed to read HEAD"),
        };
        let parents: Vec<_> = parent_commit.iter().collect();

        let oid = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .context("Failed to create commit")?;
        Ok(oid.to_string())
    }

    fn status_entries(&self) -> Result<Vec<StatusEntry>> {
        let repo = self.repo.lock();
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .include_unmodified(false);

        let statuses = repo
            .statuses(Some(&mut opts))
            .context("Failed to get repository status")?;

        let mut entries = Vec::new();
        for entry in statuses.iter() {
            let Some(path) = entry.path() else { continue };
            let status = entry.status();

            let state = if status.contains(git2::Status::WT_NEW) {
                FileState::New
            } else if status.contains(git2::Status::INDEX_NEW) {
                FileState::Added
            } else if status.contains(git2::Status::WT_DELETED)
                || status.contains(git2::Status::INDEX_DELETED)
            {
                FileState::Deleted
            } else if status.contains(git2::Status::WT_MODIFIED)
                || status.contains(git2::Status::INDEX_MODIFIED)
            {
                FileState::Modified
            } else {
                continue;
            };

            entries.push(StatusEntry {
                path: path.to_string(),
                state,
            });
        }
        Ok(entries)
    }

    fn is_tracked(&self, path: &str) -> Result<bool> {
        let repo = self.repo.lock();
        let index = repo.index().context("Failed to get repository index")?;
        Ok(index.get_path(Path::new(path), 0).is_some())
    }

    fn checkout_file(&self, path: &str) -> Result<()> {
        let repo = self.repo.lock();
        let head_tree = repo
            .head()
            .context("Failed to read HEAD")?
            .peel_to_tree()
            .context("Failed to resolve HEAD tree")?;
        let entry = head_tree
            .get_path(Path::new(path))
            .with_context(|| format!("'{path}' is not tracked at HEAD"))?;
        let blob = repo
            .find_blob(entry.id())
            .with_context(|| format!("Failed to read blob for '{path}'"))?;

        let target = self.workdir.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, blob.content())
            .with_context(|| format!("Failed to restore '{path}'"))?;

        // Re-align the index entry with what was just restored
        let mut index = repo.index()?;
        index.add_path(Path::new(path))?;
        index.write()?;
        Ok(())
    }

    fn log(&self, reference: &str, depth: usize) -> Result<Vec<CommitInfo>> {
        let repo = self.repo.lock();
        let tip = Self::commit_oid(&repo, reference)?;
        Self::collect_walk(&repo, tip, None, depth)
    }

    fn commit_details(&self, hash: &str) -> Result<CommitInfo> {
        let repo = self.repo.lock();
        let oid = git2::Oid::from_str(hash).with_context(|| format!("Invalid hash '{hash}'"))?;
        let commit = repo
            .find_commit(oid)
            .with_context(|| format!("Commit '{hash}' not found"))?;
        Ok(Self::commit_to_info(&commit))
    }

    fn parent_of(&self, hash: &str) -> Result<Option<String>> {
        let repo = self.repo.lock();
        let oid = git2::Oid::from_str(hash).with_context(|| format!("Invalid hash '{hash}'"))?;
        let commit = repo
            .find_commit(oid)
            .with_context(|| format!("Commit '{hash}' not found"))?;
        Ok(commit.parent_id(0).ok().map(|p| p.to_string()))
    }

    fn list_files(&self, reference: &str) -> Result<Vec<String>> {
        Ok(self
            .tree_entries(reference)?
            .into_iter()
            .map(|(path, _)| path)
            .collect())
    }

    fn tree_entries(&self, reference: &str) -> Result<Vec<(String, String)>> {
        let repo = self.repo.lock();
        let oid = Self::commit_oid(&repo, reference)?;
        let tree = repo.find_commit(oid)?.tree()?;

        let mut entries = Vec::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                let name = entry.name().unwrap_or_default();
                entries.push((format!("{root}{name}"), entry.id().to_string()));
            }
            git2::TreeWalkResult::Ok
        })?;
        entries.sort();
        Ok(entries)
    }

    fn read_blob(&self, reference: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let repo = self.repo.lock();
        let oid = Self::commit_oid(&repo, reference)?;
        let tree = repo.find_commit(oid)?.tree()?;

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to look up '{path}' at '{reference}'"))
            }
        };
        let blob = repo
            .find_blob(entry.id())
            .with_context(|| format!("Failed to read blob for '{path}'"))?;
        Ok(Some(blob.content().to_vec()))
    }

    fn resolve_ref(&self, reference: &str) -> Result<Option<String>> {
        let repo = self.repo.lock();
        let resolved = match repo.revparse_single(reference) {
            Ok(obj) => Ok(Some(obj.peel_to_commit()?.id().to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to resolve '{reference}'")),
        };
        resolved
    }

    fn is_descendant(&self, descendant: &str, ancestor: &str) -> Result<bool> {
        let repo = self.repo.lock();
        let desc = git2::Oid::from_str(descendant)?;
        let anc = git2::Oid::from_str(ancestor)?;
        repo.graph_descendant_of(desc, anc)
            .context("Failed to check ancestry")
    }

    fn commits_between(&self, tip: &str, exclude: &str) -> Result<Vec<CommitInfo>> {
        let repo = self.repo.lock();
        let tip = git2::Oid::from_str(tip)?;
        let exclude = git2::Oid::from_str(exclude)?;
        Self::collect_walk(&repo, tip, Some(exclude), 0)
    }

    fn current_branch(&self) -> Result<String> {
        let repo = self.repo.lock();
        // Read the symbolic target directly so this works before the
        // first commit, when HEAD is unborn.
        let head = repo
            .find_reference("HEAD")
            .context("Failed to read HEAD reference")?;
        match head.symbolic_target() {
            Some(target) => Ok(target
                .strip_prefix("refs/heads/")
                .unwrap_or(target)
                .to_string()),
            None => Err(anyhow!("HEAD is detached")),
        }
    }

    fn head_commit(&self) -> Result<Option<String>> {
        let repo = self.repo.lock();
        let head = match repo.head() {
            Ok(head) => Ok(head.target().map(|oid| oid.to_string())),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to read HEAD"),
        };
        head
    }

    fn head_detached(&self) -> Result<bool> {
        let repo = self.repo.lock();
        repo.head_detached().context("Failed to inspect HEAD")
    }

    fn attach_head(&self, branch: &str) -> Result<()> {
        let repo = self.repo.lock();
        let oid = repo
            .head()
            .context("Failed to read HEAD")?
            .target()
            .context("HEAD does not point at a commit")?;

        let refname = format!("refs/heads/{branch}");
        repo.reference(&refname, oid, true, "re-attach HEAD to branch")
            .with_context(|| format!("Failed to update '{refname}'"))?;
        repo.set_head(&refname)
            .with_context(|| format!("Failed to point HEAD at '{refname}'"))?;
        Ok(())
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        let repo = self.repo.lock();
        if repo.find_remote(name).is_ok() {
            repo.remote_set_url(name, url)
                .with_context(|| format!("Failed to update remote '{name}'"))?;
        } else {
            repo.remote(name, url)
                .with_context(|| format!("Failed to add remote '{name}' with URL '{url}'"))?;
        }
        Ok(())
    }

    fn remove_remote(&self, name: &str) -> Result<()> {
        let repo = self.repo.lock();
        if repo.find_remote(name).is_err() {
            return Ok(()); // already gone
        }
        repo.remote_delete(name)
            .with_context(|| format!("Failed to remove remote '{name}'"))
    }

    fn list_remotes(&self) -> Result<Vec<RemoteInfo>> {
        let repo = self.repo.lock();
        let names = repo.remotes().context("Failed to list remotes")?;

        let mut remotes = Vec::new();
        for name in names.iter().flatten() {
            let url = repo
                .find_remote(name)
                .ok()
                .and_then(|r| r.url().map(str::to_string))
                .unwrap_or_default();
            remotes.push(RemoteInfo {
                name: name.to_string(),
                url,
            });
        }
        Ok(remotes)
    }

    fn fetch(&self, remote: &str, credential: &Credential) -> Result<()> {
        let repo = self.repo.lock();
        let mut remote = repo
            .find_remote(remote)
            .with_context(|| format!("Failed to find remote '{remote}'"))?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(Self::remote_callbacks(credential));

        remote
            .fetch(&[] as &[&str], Some(&mut fetch_options), None)
            .context("Failed to fetch from remote")?;
        Ok(())
    }

    fn push(&self, remote: &str, branch: &str, credential: &Credential) -> Result<()> {
        let repo = self.repo.lock();
        let mut remote = repo
            .find_remote(remote)
            .with_context(|| format!("Failed to find remote '{remote}'"))?;

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(Self::remote_callbacks(credential));

        remote
            .push(&[&refspec], Some(&mut push_options))
            .with_context(|| {
                format!(
                    "Failed to push '{branch}' to remote '{}'",
                    remote.name().unwrap_or("unknown")
                )
            })?;
        Ok(())
    }

    fn pull(&self, remote_name: &str, branch: &str, credential: &Credential) -> Result<PullOutcome> {
        self.fetch(remote_name, credential)?;

        let repo = self.repo.lock();
        let remote_ref = format!("refs/remotes/{remote_name}/{branch}");
        let remote_oid = match repo.revparse_single(&remote_ref) {
            Ok(obj) => obj.peel_to_commit()?.id(),
            Err(e) if e.code() == ErrorCode::NotFound => {
                // Nothing on the remote side yet
                return Ok(PullOutcome::clean());
            }
            Err(e) => return Err(e).context("Failed to resolve remote branch"),
        };

        let refname = format!("refs/heads/{branch}");
        let local_oid = match repo.head() {
            Ok(head) => head.target(),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(e).context("Failed to read HEAD"),
        };

        let Some(local_oid) = local_oid else {
            // Unborn local branch: adopt the remote tip wholesale
            repo.reference(&refname, remote_oid, true, "pull: adopt remote branch")?;
            repo.set_head(&refname)?;
            repo.checkout_head(Some(git2::build::CheckoutBuilder::default().force()))?;
            return Ok(PullOutcome::clean());
        };

        let annotated = repo.find_annotated_commit(remote_oid)?;
        let (analysis, _) = repo
            .merge_analysis(&[&annotated])
            .context("Failed to analyze merge")?;

        if analysis.is_up_to_date() {
            return Ok(PullOutcome::clean());
        }

        if analysis.is_fast_forward() {
            let mut reference = repo
                .find_reference(&refname)
                .context("Failed to find branch reference")?;
            reference
                .set_target(remote_oid, "pull: fast-forward")
                .context("Failed to advance branch reference")?;
            repo.set_head(&refname).context("Failed to set HEAD")?;
            repo.checkout_head(Some(git2::build::CheckoutBuilder::default().force()))
                .context("Failed to checkout HEAD")?;
            return Ok(PullOutcome::clean());
        }

        // Diverged: compute the merge index without writing anything and
        // report the conflicting paths. This subsystem never produces
        // merge commits.
        let base_tree = match repo.merge_base(local_oid, remote_oid) {
            Ok(base) => repo.find_commit(base)?.tree()?,
            Err(_) => repo.find_tree(Self::empty_tree(&repo)?)?,
        };
        let local_tree = repo.find_commit(local_oid)?.tree()?;
        let remote_tree = repo.find_commit(remote_oid)?.tree()?;

        let merged = repo
            .merge_trees(&base_tree, &local_tree, &remote_tree, None)
            .context("Failed to compute merge")?;

        let mut conflicts = Vec::new();
        for conflict in merged.conflicts()? {
            let conflict = conflict?;
            let entry = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref());
            if let Some(entry) = entry {
                conflicts.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        conflicts.sort();
        conflicts.dedup();
        Ok(PullOutcome::conflicted(conflicts))
    }

    fn create_annotated_tag(&self, name: &str, message: &str, tagger: &Author) -> Result<()> {
        let repo = self.repo.lock();
        let target = repo
            .head()
            .context("Failed to read HEAD")?
            .peel(ObjectType::Commit)
            .context("HEAD does not point at a commit")?;
        let signature = Self::signature(tagger)?;
        repo.tag(name, &target, &signature, message, false)
            .with_context(|| format!("Failed to create tag '{name}'"))?;
        Ok(())
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let repo = self.repo.lock();
        let names = repo.tag_names(None).context("Failed to list tags")?;
        Ok(names.iter().flatten().map(str::to_string).collect())
    }

    fn read_tag(&self, name: &str) -> Result<TagRef> {
        let repo = self.repo.lock();
        let obj = repo
            .revparse_single(&format!("refs/tags/{name}"))
            .with_context(|| format!("Failed to resolve tag '{name}'"))?;

        match obj.kind() {
            Some(ObjectType::Tag) => {
                let tag = obj.into_tag().map_err(|_| anyhow!("Corrupt tag object"))?;
                let commit_hash = tag
                    .target()
                    .context("Failed to resolve tag target")?
                    .peel_to_commit()
                    .context("Tag does not point at a commit")?
                    .id()
                    .to_string();
                let timestamp_ms = tag
                    .tagger()
                    .map(|sig| sig.when().seconds() * 1000)
                    .unwrap_or_default();
                Ok(TagRef {
                    name: name.to_string(),
                    commit_hash,
                    annotation: Some(TagAnnotation {
                        message: tag.message().unwrap_or("").trim_end().to_string(),
                        timestamp_ms,
                    }),
                })
            }
            // Lightweight tag: the ref points directly at the commit
            _ => {
                let commit_hash = obj
                    .peel_to_commit()
                    .with_context(|| format!("Tag '{name}' does not point at a commit"))?
                    .id()
                    .to_string();
                Ok(TagRef {
                    name: name.to_string(),
                    commit_hash,
                    annotation: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(temp: &TempDir) -> GitEngine {
        GitEngine::open_or_init(temp.path()).unwrap()
    }

    fn write_and_commit(engine: &GitEngine, path: &str, content: &str, message: &str) -> String {
        let target = engine.workdir().join(path);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, content).unwrap();
        engine.stage_add(path).unwrap();
        engine.commit(message, &Author::default_committer()).unwrap()
    }

    #[test]
    fn test_init_uses_main_branch() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        assert_eq!(engine.current_branch().unwrap(), "main");
    }

    #[test]
    fn test_open_or_init_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let first = engine(&temp);
        write_and_commit(&first, "a.md", "a", "add a");
        drop(first);

        let reopened = GitEngine::open_or_init(temp.path()).unwrap();
        assert_eq!(reopened.log("HEAD", 0).unwrap().len(), 1);
    }

    #[test]
    fn test_commit_advances_head() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        assert!(engine.head_commit().unwrap().is_none());

        let hash = write_and_commit(&engine, "requirements/REQ-1.md", "# REQ-1", "add REQ-1");
        assert_eq!(engine.head_commit().unwrap(), Some(hash));
    }

    #[test]
    fn test_status_maps_untracked_to_new() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        std::fs::write(temp.path().join("fresh.md"), "x").unwrap();

        let entries = engine.status_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "fresh.md");
        assert_eq!(entries[0].state, FileState::New);
    }

    #[test]
    fn test_status_maps_staged_to_added() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        std::fs::write(temp.path().join("staged.md"), "x").unwrap();
        engine.stage_add("staged.md").unwrap();

        let entries = engine.status_entries().unwrap();
        assert_eq!(entries[0].state, FileState::Added);
    }

    #[test]
    fn test_status_maps_modified_and_deleted() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        write_and_commit(&engine, "a.md", "one", "add a");
        write_and_commit(&engine, "b.md", "two", "add b");

        std::fs::write(temp.path().join("a.md"), "changed").unwrap();
        std::fs::remove_file(temp.path().join("b.md")).unwrap();

        let mut entries = engine.status_entries().unwrap();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(entries[0].state, FileState::Modified);
        assert_eq!(entries[1].state, FileState::Deleted);
    }

    #[test]
    fn test_read_blob_missing_path_is_none() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        let hash = write_and_commit(&engine, "a.md", "a", "add a");
        assert!(engine.read_blob(&hash, "missing.md").unwrap().is_none());
        assert_eq!(engine.read_blob(&hash, "a.md").unwrap().unwrap(), b"a");
    }

    #[test]
    fn test_tree_entries_change_on_modification() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        let first = write_and_commit(&engine, "a.md", "one", "add");
        let second = write_and_commit(&engine, "a.md", "two", "modify");

        let before = engine.tree_entries(&first).unwrap();
        let after = engine.tree_entries(&second).unwrap();
        assert_eq!(before[0].0, after[0].0);
        assert_ne!(before[0].1, after[0].1, "blob id must change with content");
    }

    #[test]
    fn test_log_depth_bound() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        for i in 0..5 {
            write_and_commit(&engine, "a.md", &format!("v{i}"), &format!("commit {i}"));
        }
        assert_eq!(engine.log("HEAD", 3).unwrap().len(), 3);
        assert_eq!(engine.log("HEAD", 0).unwrap().len(), 5);
        // Newest first
        let log = engine.log("HEAD", 0).unwrap();
        assert_eq!(log[0].message, "commit 4");
    }

    #[test]
    fn test_timestamps_are_milliseconds() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        write_and_commit(&engine, "a.md", "a", "add");
        let info = &engine.log("HEAD", 1).unwrap()[0];
        // Sanity bound: after 2020-01-01 in ms
        assert!(info.timestamp_ms > 1_577_836_800_000);
        assert_eq!(info.timestamp_ms % 1000, 0);
    }

    #[test]
    fn test_attach_head_repairs_detached_state() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        let first = write_and_commit(&engine, "a.md", "a", "first");
        write_and_commit(&engine, "a.md", "b", "second");

        // Detach HEAD at the first commit
        {
            let repo = git2::Repository::open(temp.path()).unwrap();
            repo.set_head_detached(git2::Oid::from_str(&first).unwrap())
                .unwrap();
        }
        assert!(engine.head_detached().unwrap());

        engine.attach_head(DEFAULT_BRANCH).unwrap();
        assert!(!engine.head_detached().unwrap());
        assert_eq!(engine.current_branch().unwrap(), DEFAULT_BRANCH);
        // The branch now points at the previously detached commit
        assert_eq!(engine.head_commit().unwrap(), Some(first));
    }

    #[test]
    fn test_add_remote_is_last_write_wins() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        engine
            .add_remote("origin", "https://example.com/a.git")
            .unwrap();
        engine
            .add_remote("origin", "https://example.com/b.git")
            .unwrap();

        let remotes = engine.list_remotes().unwrap();
        assert_eq!(remotes.len(), 1);
        assert_eq!(remotes[0].url, "https://example.com/b.git");
    }

    #[test]
    fn test_remove_remote_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        engine
            .add_remote("origin", "https://example.com/a.git")
            .unwrap();
        engine.remove_remote("origin").unwrap();
        engine.remove_remote("origin").unwrap();
        assert!(engine.list_remotes().unwrap().is_empty());
    }

    #[test]
    fn test_annotated_tag_round_trip() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        let hash = write_and_commit(&engine, "a.md", "a", "add");

        engine
            .create_annotated_tag("proj-baseline-1", "first baseline", &Author::baseline_tagger())
            .unwrap();

        let tags = engine.list_tags().unwrap();
        assert_eq!(tags, vec!["proj-baseline-1"]);

        let tag = engine.read_tag("proj-baseline-1").unwrap();
        assert_eq!(tag.commit_hash, hash);
        let annotation = tag.annotation.expect("annotated tag carries annotation");
        assert_eq!(annotation.message, "first baseline");
    }

    #[test]
    fn test_lightweight_tag_has_no_annotation() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        let hash = write_and_commit(&engine, "a.md", "a", "add");

        {
            let repo = git2::Repository::open(temp.path()).unwrap();
            let obj = repo.revparse_single(&hash).unwrap();
            repo.tag_lightweight("light", &obj, false).unwrap();
        }

        let tag = engine.read_tag("light").unwrap();
        assert_eq!(tag.commit_hash, hash);
        assert!(tag.annotation.is_none());
    }

    #[test]
    fn test_is_descendant() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        let first = write_and_commit(&engine, "a.md", "1", "one");
        let second = write_and_commit(&engine, "a.md", "2", "two");

        assert!(engine.is_descendant(&second, &first).unwrap());
        assert!(!engine.is_descendant(&first, &second).unwrap());
    }

    #[test]
    fn test_commits_between() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        let base = write_and_commit(&engine, "a.md", "1", "one");
        write_and_commit(&engine, "a.md", "2", "two");
        let tip = write_and_commit(&engine, "a.md", "3", "three");

        let between = engine.commits_between(&tip, &base).unwrap();
        assert_eq!(between.len(), 2);
        assert_eq!(between[0].message, "three");
        assert_eq!(between[1].message, "two");
    }

    #[test]
    fn test_checkout_file_restores_content() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        write_and_commit(&engine, "a.md", "committed", "add");

        std::fs::write(temp.path().join("a.md"), "scribbled").unwrap();
        engine.checkout_file("a.md").unwrap();

        let restored = std::fs::read_to_string(temp.path().join("a.md")).unwrap();
        assert_eq!(restored, "committed");
        assert!(engine.status_entries().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_missing_ref_is_none() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        write_and_commit(&engine, "a.md", "a", "add");
        assert!(engine
            .resolve_ref("refs/remotes/origin/main")
            .unwrap()
            .is_none());
        assert!(engine.resolve_ref("HEAD").unwrap().is_some());
    }
}
