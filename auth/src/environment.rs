//! OTP flow environment.
//!
//! This module defines the environment type for dependency injection
//! in the OTP flow reducer.

use crate::providers::{ChallengeRepository, IdentityService, SessionStore};
use crate::validation::ContactValidator;
use faith_connect_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// OTP flow environment.
///
/// Contains all external dependencies needed by the flow reducer.
///
/// # Type Parameters
///
/// - `I`: Identity service
/// - `C`: Challenge repository
/// - `S`: Session store
#[derive(Clone)]
pub struct OtpEnvironment<I, C, S>
where
    I: IdentityService + Clone,
    C: ChallengeRepository + Clone,
    S: SessionStore + Clone,
{
    /// Identity service (HTTP in production).
    pub identity: I,

    /// Active challenge storage (in-memory or `Redis`).
    pub challenges: C,

    /// Login state storage (in-memory or `Redis`).
    pub sessions: S,

    /// Clock for challenge and login timestamps.
    pub clock: Arc<dyn Clock>,

    /// Contact format rules.
    pub validator: ContactValidator,
}

impl<I, C, S> OtpEnvironment<I, C, S>
where
    I: IdentityService + Clone,
    C: ChallengeRepository + Clone,
    S: SessionStore + Clone,
{
    /// Create an environment with the system clock and default contact rules.
    #[must_use]
    pub fn new(identity: I, challenges: C, sessions: S) -> Self {
        Self {
            identity,
            challenges,
            sessions,
            clock: Arc::new(SystemClock),
            validator: ContactValidator::default(),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the contact rules.
    #[must_use]
    pub fn with_validator(mut self, validator: ContactValidator) -> Self {
        self.validator = validator;
        self
    }
}
