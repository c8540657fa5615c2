//! Redis-based session store implementation.
//!
//! # Architecture
//!
//! Login state is stored in Redis with:
//! - **Key**: `otp_session:{session_key}` → bincode-serialized `LoginSession`
//! - **TTL**: Configurable expiration (default 24 hours)
//!
//! # Example
//!
//! ```no_run
//! use faith_connect_auth::stores::RedisSessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSessionStore::new("redis://127.0.0.1:6379", "tab-42").await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::keys;
use crate::error::{OtpError, Result};
use crate::providers::{LoginSession, SessionStore};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Default login lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Redis-based session store with TTL-based expiration.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    /// Redis key for this browser session.
    key: String,
    /// Login lifetime.
    ttl: Duration,
}

impl RedisSessionStore {
    /// Create a new Redis session store for one browser session.
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str, session_key: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| OtpError::Storage(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            OtpError::Storage(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self {
            conn_manager,
            key: Self::session_key(session_key),
            ttl: DEFAULT_TTL,
        })
    }

    /// Set login lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Get the Redis key for a browser session.
    fn session_key(session_key: &str) -> String {
        format!("{}{session_key}", keys::SESSION_PREFIX)
    }
}

impl SessionStore for RedisSessionStore {
    async fn store_login(&self, session: &LoginSession) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let bytes = bincode::serialize(session).map_err(|e| OtpError::Storage(e.to_string()))?;
        let ttl_seconds = self.ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(&self.key, bytes, ttl_seconds)
            .await
            .map_err(|e| OtpError::Storage(format!("Failed to store session: {e}")))?;

        tracing::info!(
            user_id = %session.user.id,
            ttl_seconds,
            "Stored login session in Redis"
        );

        Ok(())
    }

    async fn current(&self) -> Result<Option<LoginSession>> {
        let mut conn = self.conn_manager.clone();

        let bytes: Option<Vec<u8>> = conn
            .get(&self.key)
            .await
            .map_err(|e| OtpError::Storage(format!("Failed to load session: {e}")))?;

        bytes
            .map(|bytes| {
                bincode::deserialize(&bytes).map_err(|e| OtpError::Storage(e.to_string()))
            })
            .transpose()
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .del(&self.key)
            .await
            .map_err(|e| OtpError::Storage(format!("Failed to clear session: {e}")))?;

        Ok(())
    }
}
