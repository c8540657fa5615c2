//! Mock provider implementations for testing.
//!
//! This module provides scripted, in-memory implementations of the provider
//! traits for use in unit and integration tests. Challenge storage needs no
//! mock; use [`crate::stores::InMemoryChallengeStore`].

pub mod identity;
pub mod session;

pub use identity::MockIdentityService;
pub use session::MockSessionStore;
