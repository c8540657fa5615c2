//! Challenge repository trait.
//!
//! Holds the single active challenge for a browser session so the
//! verification step can recover it after a reload.
//!
//! # Implementation
//!
//! **Production**: Redis with a short TTL (`SET key value EX ttl`)
//! **Testing**: In-memory slot behind a lock
//!
//! # Example
//!
//! ```ignore
//! challenges.set(&challenge).await?;
//!
//! match challenges.get().await? {
//!     Some(challenge) => resume_verification(challenge),
//!     None => return Err(OtpError::StaleChallenge),
//! }
//!
//! challenges.clear().await?;
//! ```

use crate::error::Result;
use crate::state::OtpChallenge;

/// Storage for the active challenge of one browser session.
///
/// There is at most one active challenge; `set` replaces any previous one.
pub trait ChallengeRepository: Send + Sync {
    /// Load the active challenge.
    ///
    /// # Errors
    ///
    /// Returns error on storage failure. A missing challenge is `Ok(None)`.
    fn get(&self) -> impl std::future::Future<Output = Result<Option<OtpChallenge>>> + Send;

    /// Store `challenge` as the active challenge.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    fn set(
        &self,
        challenge: &OtpChallenge,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove the active challenge. Clearing an empty repository is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if deletion fails.
    fn clear(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}
