//! Session state shared by every service of one subsystem instance.
//!
//! A single owned object, handed to each component at construction, that
//! records whether `init()` has completed and whether the once-per-session
//! head-attachment check has already run.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::VcsError;

#[derive(Debug, Default)]
pub struct Session {
    initialized: AtomicBool,
    head_checked: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// Fail fast when an operation runs before `init()` succeeds.
    pub fn require_initialized(&self) -> Result<(), VcsError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(VcsError::NotInitialized)
        }
    }

    /// True exactly once per session: the caller that wins performs the
    /// head-attachment check, everyone after relies on its result.
    pub fn claim_head_check(&self) -> bool {
        !self.head_checked.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_initialized_fails_before_init() {
        let session = Session::new();
        assert!(matches!(
            session.require_initialized(),
            Err(VcsError::NotInitialized)
        ));
        session.mark_initialized();
        assert!(session.require_initialized().is_ok());
    }

    #[test]
    fn test_head_check_claimed_once() {
        let session = Session::new();
        assert!(session.claim_head_check());
        assert!(!session.claim_head_check());
        assert!(!session.claim_head_check());
    }
}
