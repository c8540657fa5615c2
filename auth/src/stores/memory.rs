//! In-memory challenge and session stores.
//!
//! Tab-scoped storage: each store instance is one browser session. Clones
//! share the same slot.

use crate::error::Result;
use crate::providers::{ChallengeRepository, LoginSession, SessionStore};
use crate::state::OtpChallenge;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Active challenge held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChallengeStore {
    slot: Arc<RwLock<Option<OtpChallenge>>>,
}

impl InMemoryChallengeStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a challenge, e.g. one carried over from a previous view.
    #[must_use]
    pub fn with_challenge(challenge: OtpChallenge) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(challenge))),
        }
    }
}

impl ChallengeRepository for InMemoryChallengeStore {
    async fn get(&self) -> Result<Option<OtpChallenge>> {
        Ok(self.slot.read().await.clone())
    }

    async fn set(&self, challenge: &OtpChallenge) -> Result<()> {
        *self.slot.write().await = Some(challenge.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// Login state held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    slot: Arc<RwLock<Option<LoginSession>>>,
}

impl InMemorySessionStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    async fn store_login(&self, session: &LoginSession) -> Result<()> {
        *self.slot.write().await = Some(session.clone());
        Ok(())
    }

    async fn current(&self) -> Result<Option<LoginSession>> {
        Ok(self.slot.read().await.clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}
