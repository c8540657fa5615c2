//! Storage implementations for the OTP flow.
//!
//! - **In-memory** - Tab-scoped storage, lost when the process exits
//! - **Challenge Store** (Redis) - Active challenge per browser session with TTL
//! - **Session Store** (Redis) - Login state per browser session

pub mod challenge_redis;
pub mod memory;
pub mod session_redis;

// Re-exports
pub use challenge_redis::RedisChallengeStore;
pub use memory::{InMemoryChallengeStore, InMemorySessionStore};
pub use session_redis::RedisSessionStore;
