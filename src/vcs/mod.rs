//! Version-control core: repository repair, artifact persistence,
//! serialized commits, and working-tree status.
//!
//! The core owns the subsystem's two consistency mechanisms: the fair
//! commit lock that orders every history mutation, and the short-lived
//! status cache plus per-path grace window that mask read-after-write
//! staleness in the engine's own index reads.

mod artifacts;
mod commit;
pub mod init;
mod status;

use parking_lot::{FairMutex, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::CommitFileCache;
use crate::engine::{Engine, StatusEntry};
use crate::session::Session;
use crate::vfs::Vfs;

/// How long a computed status result is served from cache.
pub(crate) const STATUS_TTL: Duration = Duration::from_millis(300);

/// How long a freshly committed path is hidden from status results.
pub(crate) const GRACE_WINDOW: Duration = Duration::from_secs(5);

pub(crate) struct StatusCacheEntry {
    pub computed_at: Instant,
    pub entries: Vec<StatusEntry>,
}

pub struct VcsCore {
    pub(crate) vfs: Arc<Vfs>,
    pub(crate) engine: Arc<dyn Engine>,
    pub(crate) session: Arc<Session>,
    pub(crate) commit_cache: Arc<CommitFileCache>,
    /// Fair (FIFO) lock: commits complete strictly in lock-acquisition
    /// order, the subsystem's one hard ordering guarantee.
    pub(crate) commit_lock: FairMutex<()>,
    pub(crate) status_cache: Mutex<Option<StatusCacheEntry>>,
    pub(crate) recently_committed: Mutex<HashMap<String, Instant>>,
}

impl VcsCore {
    pub fn new(
        vfs: Arc<Vfs>,
        engine: Arc<dyn Engine>,
        session: Arc<Session>,
        commit_cache: Arc<CommitFileCache>,
    ) -> Self {
        Self {
            vfs,
            engine,
            session,
            commit_cache,
            commit_lock: FairMutex::new(()),
            status_cache: Mutex::new(None),
            recently_committed: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn invalidate_status_cache(&self) {
        *self.status_cache.lock() = None;
    }

    pub(crate) fn mark_recently_committed(&self, path: &str) {
        self.recently_committed
            .lock()
            .insert(path.to_string(), Instant::now());
    }
}
