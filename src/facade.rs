//! Composite facade: single entry point over the whole subsystem.
//!
//! Owns the storage backend, the virtual filesystem, the engine, the
//! shared commit-file cache, and the session object, and wires the
//! services together with explicit constructor dependencies. Every
//! operation except [`ArtifactVcs::init`] fails fast with the
//! not-initialized error until `init()` has succeeded.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::baseline::{BaselineInfo, BaselineService};
use crate::cache::CommitFileCache;
use crate::engine::{
    Author, CommitInfo, Engine, GitEngine, PullOutcome, RemoteInfo, StatusEntry,
};
use crate::error::VcsError;
use crate::history::{HistoryService, ProjectSnapshot};
use crate::paths::ArtifactKind;
use crate::remote::{RemoteService, TokenStore};
use crate::session::Session;
use crate::store::{NativeStore, SandboxStore, StorageBackend};
use crate::sync::{SyncService, SyncStatus};
use crate::vcs::{init as repo_init, VcsCore};
use crate::vfs::Vfs;

struct Services {
    core: Arc<VcsCore>,
    history: HistoryService,
    baseline: BaselineService,
    remote: Arc<RemoteService>,
    sync: SyncService,
}

pub struct ArtifactVcs {
    vfs: Arc<Vfs>,
    workdir: PathBuf,
    session: Arc<Session>,
    token_store: parking_lot::Mutex<Option<TokenStore>>,
    services: OnceLock<Services>,
}

impl ArtifactVcs {
    /// Build against any storage backend. `workdir` is the host directory
    /// the backend is mounted on; the engine keeps its metadata there.
    pub fn new(backend: Arc<dyn StorageBackend>, workdir: impl AsRef<Path>) -> Self {
        Self {
            vfs: Arc::new(Vfs::new(backend)),
            workdir: workdir.as_ref().to_path_buf(),
            session: Arc::new(Session::new()),
            token_store: parking_lot::Mutex::new(None),
            services: OnceLock::new(),
        }
    }

    /// Privileged native-path backend (desktop-class host).
    pub fn with_native_store(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(Arc::new(NativeStore::new(root)), root)
    }

    /// Permission-scoped sandboxed backend (browser-class host).
    pub fn with_sandbox_store(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(Arc::new(SandboxStore::new(root)), root)
    }

    /// Use a specific token store instead of the default config-directory
    /// locations. Must be called before `init()`.
    pub fn with_token_store(self, store: TokenStore) -> Self {
        *self.token_store.lock() = Some(store);
        self
    }

    /// Initialize (or repair) the repository and wire the services.
    /// Idempotent: once initialized, repeat calls return immediately.
    pub fn init(&self) -> Result<()> {
        if self.session.is_initialized() {
            return Ok(());
        }

        repo_init::ensure_project_layout(&self.vfs)?;
        repo_init::repair_metadata(&self.vfs)?;

        let engine: Arc<dyn Engine> = Arc::new(GitEngine::open_or_init(&self.workdir)?);
        repo_init::ensure_exclude(&self.vfs)?;

        let commit_cache = Arc::new(CommitFileCache::new(Arc::clone(&self.vfs)));
        commit_cache.load_once()?;

        let core = Arc::new(VcsCore::new(
            Arc::clone(&self.vfs),
            Arc::clone(&engine),
            Arc::clone(&self.session),
            Arc::clone(&commit_cache),
        ));

        let tokens = match self.token_store.lock().take() {
            Some(store) => store,
            None => TokenStore::default_locations()?,
        };
        let remote = Arc::new(RemoteService::new(Arc::clone(&engine), tokens));

        let services = Services {
            history: HistoryService::new(Arc::clone(&engine), Arc::clone(&commit_cache)),
            baseline: BaselineService::new(Arc::clone(&engine)),
            sync: SyncService::new(
                Arc::clone(&engine),
                Arc::clone(&self.vfs),
                Arc::clone(&core),
                Arc::clone(&remote),
            ),
            remote,
            core,
        };

        // A lost race here means another caller finished init first;
        // both end up with an equivalent wiring.
        let _ = self.services.set(services);
        self.session.mark_initialized();
        log::info!(
            "Repository initialized at {}",
            self.vfs.backend().root_identifier()
        );
        Ok(())
    }

    fn services(&self) -> Result<&Services> {
        self.session.require_initialized()?;
        self.services
            .get()
            .ok_or_else(|| VcsError::NotInitialized.into())
    }

    // -- artifacts and working tree --

    pub fn save_artifact(&self, kind: ArtifactKind, id: &str, data: &str) -> Result<String> {
        self.services()?.core.save_artifact(kind, id, data)
    }

    pub fn delete_artifact(&self, kind: ArtifactKind, id: &str) -> Result<String> {
        self.services()?.core.delete_artifact(kind, id)
    }

    pub fn get_status(&self) -> Result<Vec<StatusEntry>> {
        self.services()?.core.get_status()
    }

    pub fn commit_file(
        &self,
        path: &str,
        message: &str,
        author: Option<Author>,
    ) -> Result<String> {
        self.services()?.core.commit_file(path, message, author)
    }

    pub fn rename_file(
        &self,
        old_path: &str,
        new_path: &str,
        new_content: &str,
        message: Option<&str>,
    ) -> Result<String> {
        self.services()?
            .core
            .rename_file(old_path, new_path, new_content, message)
    }

    pub fn revert_file(&self, path: &str) -> Result<()> {
        self.services()?.core.revert_file(path)
    }

    // -- history --

    pub fn get_history(
        &self,
        path: Option<&str>,
        depth: usize,
        reference: &str,
    ) -> Result<Vec<CommitInfo>> {
        self.services()?.history.get_history(path, depth, reference)
    }

    pub fn get_commit_files(&self, hash: &str) -> Result<Vec<String>> {
        self.services()?.history.get_commit_files(hash)
    }

    pub fn read_file_at_commit(&self, path: &str, hash: &str) -> Result<Option<String>> {
        self.services()?.history.read_file_at_commit(path, hash)
    }

    pub fn list_files_at_commit(&self, hash: &str) -> Result<Vec<String>> {
        self.services()?.history.list_files_at_commit(hash)
    }

    pub fn load_project_snapshot(&self, hash: &str) -> Result<ProjectSnapshot> {
        self.services()?.history.load_project_snapshot(hash)
    }

    // -- baselines --

    pub fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        self.services()?.baseline.create_tag(name, message)
    }

    pub fn list_tags(&self) -> Result<Vec<String>> {
        self.services()?.baseline.list_tags()
    }

    pub fn get_tags_with_details(&self) -> Result<Vec<BaselineInfo>> {
        self.services()?.baseline.get_tags_with_details()
    }

    // -- remotes and credentials --

    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.services()?.remote.add_remote(name, url)
    }

    pub fn remove_remote(&self, name: &str) -> Result<()> {
        self.services()?.remote.remove_remote(name)
    }

    pub fn get_remotes(&self) -> Result<Vec<RemoteInfo>> {
        self.services()?.remote.get_remotes()
    }

    pub fn has_remote(&self, name: &str) -> Result<bool> {
        Ok(self.services()?.remote.has_remote(name))
    }

    pub fn set_auth_token(&self, token: &str) -> Result<()> {
        self.services()?.remote.set_auth_token(token)
    }

    pub fn clear_auth_token(&self) -> Result<()> {
        self.services()?.remote.clear_auth_token()
    }

    pub fn get_auth_token(&self) -> Result<Option<String>> {
        Ok(self.services()?.remote.get_auth_token())
    }

    pub fn fetch(&self, remote: &str) -> Result<()> {
        self.services()?.remote.fetch(remote)
    }

    pub fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.services()?.remote.push(remote, branch)
    }

    pub fn pull(&self, remote: &str, branch: &str) -> Result<PullOutcome> {
        self.services()?.remote.pull(remote, branch)
    }

    // -- sync --

    pub fn get_current_branch(&self) -> Result<String> {
        self.services()?.sync.current_branch()
    }

    pub fn get_sync_status(&self, remote: &str, branch: Option<&str>) -> Result<SyncStatus> {
        self.services()?.sync.get_sync_status(remote, branch)
    }

    pub fn pull_counters(&self, remote: &str) -> Result<usize> {
        self.services()?.sync.pull_counters(remote)
    }

    pub fn push_counters(&self, remote: &str, message: Option<&str>) -> Result<bool> {
        self.services()?.sync.push_counters(remote, message)
    }
}
