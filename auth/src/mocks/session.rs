//! Mock session store for testing.

use crate::error::{OtpError, Result};
use crate::providers::{LoginSession, SessionStore};
use std::sync::{Arc, Mutex};

/// Mock session store.
///
/// Records every login write so tests can assert the store was mutated
/// exactly once. Can be told to fail.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    logins: Arc<Mutex<Vec<LoginSession>>>,
    failure: Arc<Mutex<Option<OtpError>>>,
}

impl MockSessionStore {
    /// Create a new mock session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `error`.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn fail_with(&self, error: OtpError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Number of successful `store_login` calls.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn login_count(&self) -> usize {
        self.logins.lock().unwrap().len()
    }

    /// Every stored login, oldest first.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn logins(&self) -> Vec<LoginSession> {
        self.logins.lock().unwrap().clone()
    }
}

impl SessionStore for MockSessionStore {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn store_login(&self, session: &LoginSession) -> Result<()> {
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.logins.lock().unwrap().push(session.clone());
        Ok(())
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn current(&self) -> Result<Option<LoginSession>> {
        Ok(self.logins.lock().unwrap().last().cloned())
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn clear(&self) -> Result<()> {
        self.logins.lock().unwrap().clear();
        Ok(())
    }
}
