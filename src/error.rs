//! Typed failure taxonomy for the version-control subsystem.
//!
//! Most call sites use `anyhow::Result` with context, matching the rest of
//! the crate; the variants here exist so callers can distinguish the
//! handful of conditions that need programmatic handling (fail-fast before
//! init, missing credentials, absent paths) via `downcast_ref`.

use thiserror::Error;

/// Errors the caller is expected to branch on.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Repository not initialized. Call init() first.")]
    NotInitialized,

    #[error("No authentication token stored. Set a token before remote operations.")]
    AuthenticationRequired,

    #[error("No such file or directory: '{path}'")]
    NotFound { path: String },

    #[error("HEAD is detached; committing would not advance any branch")]
    DetachedHead,
}

impl VcsError {
    /// True if an anyhow error chain bottoms out in a not-found condition,
    /// either ours or an I/O one.
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        if matches!(err.downcast_ref::<VcsError>(), Some(VcsError::NotFound { .. })) {
            return true;
        }
        err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found_on_vcs_error() {
        let err = anyhow::Error::new(VcsError::NotFound {
            path: "x.md".into(),
        });
        assert!(VcsError::is_not_found(&err));
    }

    #[test]
    fn test_is_not_found_on_io_error() {
        let err = anyhow::Error::new(crate::paths::not_found("y.md")).context("reading y.md");
        assert!(VcsError::is_not_found(&err));
    }

    #[test]
    fn test_is_not_found_negative() {
        let err = anyhow::anyhow!("something else broke");
        assert!(!VcsError::is_not_found(&err));
    }
}
