//! Redis-based challenge store implementation.
//!
//! # Architecture
//!
//! The active challenge is stored in Redis with:
//! - **Key**: `otp_challenge:{session_key}` → bincode-serialized `OtpChallenge`
//! - **TTL**: Configurable (default 15 minutes), refreshed on every `set`
//!
//! One store instance serves one browser session.
//!
//! # Example
//!
//! ```no_run
//! use faith_connect_auth::stores::RedisChallengeStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisChallengeStore::new("redis://127.0.0.1:6379", "tab-42").await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::keys;
use crate::error::{OtpError, Result};
use crate::providers::ChallengeRepository;
use crate::state::OtpChallenge;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Default challenge lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// `Redis`-based challenge repository.
///
/// Provides:
/// - Short-lived persistence (TTL) so a reload can resume verification
/// - Connection pooling via `ConnectionManager`
#[derive(Clone)]
pub struct RedisChallengeStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    /// Redis key for this browser session.
    key: String,
    /// Challenge lifetime.
    ttl: Duration,
}

impl RedisChallengeStore {
    /// Create a new `Redis` challenge store for one browser session.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    /// * `session_key` - Identifier of the browser session
    ///
    /// # Errors
    ///
    /// Returns error if connection to `Redis` fails.
    pub async fn new(redis_url: &str, session_key: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| OtpError::Storage(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            OtpError::Storage(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self {
            conn_manager,
            key: Self::challenge_key(session_key),
            ttl: DEFAULT_TTL,
        })
    }

    /// Set challenge lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Get the `Redis` key for a browser session.
    fn challenge_key(session_key: &str) -> String {
        format!("{}{session_key}", keys::CHALLENGE_PREFIX)
    }
}

impl ChallengeRepository for RedisChallengeStore {
    async fn get(&self) -> Result<Option<OtpChallenge>> {
        let mut conn = self.conn_manager.clone();

        let bytes: Option<Vec<u8>> = conn
            .get(&self.key)
            .await
            .map_err(|e| OtpError::Storage(format!("Failed to load challenge: {e}")))?;

        bytes
            .map(|bytes| {
                bincode::deserialize(&bytes).map_err(|e| OtpError::Storage(e.to_string()))
            })
            .transpose()
    }

    async fn set(&self, challenge: &OtpChallenge) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let bytes =
            bincode::serialize(challenge).map_err(|e| OtpError::Storage(e.to_string()))?;
        let ttl_seconds = self.ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(&self.key, bytes, ttl_seconds)
            .await
            .map_err(|e| OtpError::Storage(format!("Failed to store challenge: {e}")))?;

        tracing::info!(
            contact = %challenge.masked_contact(),
            method = %challenge.method,
            ttl_seconds,
            "Stored OTP challenge in Redis"
        );

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .del(&self.key)
            .await
            .map_err(|e| OtpError::Storage(format!("Failed to clear challenge: {e}")))?;

        tracing::debug!(key = %self.key, "Cleared OTP challenge");
        Ok(())
    }
}
