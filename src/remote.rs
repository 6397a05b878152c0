//! Remote registry, credential storage, and authenticated transport.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ConfigManager;
use crate::engine::{Credential, Engine, PullOutcome, RemoteInfo};
use crate::error::VcsError;

/// Two-location token store with an in-memory cache.
///
/// Reads try the primary (secure) location first and fall back to the
/// legacy store; writes go to the primary with a legacy-store write when
/// the primary fails, so a token is never silently lost.
pub struct TokenStore {
    primary: PathBuf,
    legacy: PathBuf,
    cached: Mutex<Option<String>>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct LegacyTokenDoc {
    token: String,
}

impl TokenStore {
    pub fn new(primary: PathBuf, legacy: PathBuf) -> Self {
        Self {
            primary,
            legacy,
            cached: Mutex::new(None),
        }
    }

    /// Store rooted in the user's configuration directory.
    pub fn default_locations() -> Result<Self> {
        ConfigManager::ensure_config_dir()?;
        Ok(Self::new(
            ConfigManager::token_file_path()?,
            ConfigManager::legacy_token_file_path()?,
        ))
    }

    /// Cached after the first successful load.
    pub fn get(&self) -> Option<String> {
        if let Some(token) = self.cached.lock().clone() {
            return Some(token);
        }

        let loaded = self.load_primary().or_else(|| self.load_legacy());
        if let Some(ref token) = loaded {
            *self.cached.lock() = Some(token.clone());
        }
        loaded
    }

    pub fn set(&self, token: &str) -> Result<()> {
        *self.cached.lock() = Some(token.to_string());

        if let Err(primary_err) = self.write_primary(token) {
            log::warn!("Primary token store write failed, using fallback: {primary_err}");
            self.write_legacy(token)
                .context("Both token store locations failed")?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        *self.cached.lock() = None;
        for path in [&self.primary, &self.legacy] {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to clear token at {}", path.display()))
                }
            }
        }
        Ok(())
    }

    fn load_primary(&self) -> Option<String> {
        let text = std::fs::read_to_string(&self.primary).ok()?;
        let token = text.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    fn load_legacy(&self) -> Option<String> {
        let text = std::fs::read_to_string(&self.legacy).ok()?;
        let doc: LegacyTokenDoc = serde_json::from_str(&text).ok()?;
        (!doc.token.is_empty()).then_some(doc.token)
    }

    fn write_primary(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.primary.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.primary, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.primary, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn write_legacy(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.legacy.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let doc = serde_json::to_string(&LegacyTokenDoc {
            token: token.to_string(),
        })?;
        std::fs::write(&self.legacy, doc)?;
        Ok(())
    }
}

pub struct RemoteService {
    engine: Arc<dyn Engine>,
    tokens: TokenStore,
}

impl RemoteService {
    pub fn new(engine: Arc<dyn Engine>, tokens: TokenStore) -> Self {
        Self { engine, tokens }
    }

    // -- remote registry --

    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.engine.add_remote(name, url)
    }

    pub fn remove_remote(&self, name: &str) -> Result<()> {
        self.engine.remove_remote(name)
    }

    pub fn get_remotes(&self) -> Result<Vec<RemoteInfo>> {
        self.engine.list_remotes()
    }

    pub fn has_remote(&self, name: &str) -> bool {
        self.get_remotes()
            .map(|remotes| remotes.iter().any(|r| r.name == name))
            .unwrap_or(false)
    }

    // -- credentials --

    pub fn set_auth_token(&self, token: &str) -> Result<()> {
        self.tokens.set(token)
    }

    pub fn clear_auth_token(&self) -> Result<()> {
        self.tokens.clear()
    }

    pub fn get_auth_token(&self) -> Option<String> {
        self.tokens.get()
    }

    /// Fail fast before any network call when no token is stored.
    fn credential(&self) -> Result<Credential> {
        self.tokens
            .get()
            .map(Credential::token)
            .ok_or_else(|| VcsError::AuthenticationRequired.into())
    }

    // -- transport --

    pub fn fetch(&self, remote: &str) -> Result<()> {
        let credential = self.credential()?;
        self.engine.fetch(remote, &credential)
    }

    pub fn push(&self, remote: &str, branch: &str) -> Result<()> {
        let credential = self.credential()?;
        self.engine.push(remote, branch, &credential)
    }

    /// Pull distinguishes a clean fast-forward from a conflicting merge by
    /// the merge index, never by string-matching failure messages.
    pub fn pull(&self, remote: &str, branch: &str) -> Result<PullOutcome> {
        let credential = self.credential()?;
        self.engine.pull(remote, branch, &credential)
    }
}
