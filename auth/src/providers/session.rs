//! Session store trait.

use crate::error::Result;
use crate::state::{SessionTokens, UserRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted login state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSession {
    /// Logged-in profile.
    pub user: UserRecord,

    /// Tokens issued by the identity service.
    pub tokens: SessionTokens,

    /// When the login was stored.
    pub logged_in_at: DateTime<Utc>,
}

/// Session store.
///
/// Written exactly once per successful flow, at the existing-user login
/// transition.
pub trait SessionStore: Send + Sync {
    /// Persist a login.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    fn store_login(
        &self,
        session: &LoginSession,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Load the current login, if any.
    ///
    /// # Errors
    ///
    /// Returns error on storage failure.
    fn current(&self) -> impl std::future::Future<Output = Result<Option<LoginSession>>> + Send;

    /// Log out.
    ///
    /// # Errors
    ///
    /// Returns error if deletion fails.
    fn clear(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}
