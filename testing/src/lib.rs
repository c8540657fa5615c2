//! # Faith Connect Testing
//!
//! Testing utilities and helpers for Faith Connect reducers.
//!
//! This crate provides:
//! - Deterministic clocks
//! - A Given-When-Then builder for reducers ([`ReducerTest`])
//! - Effect assertion helpers
//! - Property-based testing strategies for contacts and codes
//!
//! ## Example
//!
//! ```ignore
//! use faith_connect_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(OtpFlowReducer::new())
//!     .with_env(test_environment())
//!     .given_state(OtpState::default())
//!     .when_action(OtpAction::Cancel)
//!     .then_state(|state| assert_eq!(state.phase, FlowPhase::Idle))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use faith_connect_core::environment::Clock;

pub mod reducer_test;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use faith_connect_testing::mocks::FixedClock;
    /// use faith_connect_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Safe to call from every test; only the first call installs anything.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "faith_connect=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Codes of exactly `length` ASCII digits.
    pub fn digit_code(length: usize) -> impl Strategy<Value = String> {
        proptest::collection::vec(proptest::char::range('0', '9'), length)
            .prop_map(|digits| digits.into_iter().collect())
    }

    /// Arbitrary short strings mixing digits, letters, whitespace and symbols.
    pub fn noisy_input() -> impl Strategy<Value = String> {
        "[0-9a-zA-Z \\-+()]{0,16}"
    }

    /// Well-formed email addresses.
    pub fn email_address() -> impl Strategy<Value = String> {
        ("[a-z][a-z0-9._]{0,10}[a-z0-9]", "[a-z][a-z0-9]{0,8}", "[a-z]{2,6}")
            .prop_filter("no consecutive dots", |(user, _, _)| !user.contains(".."))
            .prop_map(|(user, domain, tld)| format!("{user}@{domain}.{tld}"))
    }

    /// Kenyan mobile numbers in `+254XXXXXXXXX` form.
    pub fn kenyan_phone() -> impl Strategy<Value = String> {
        "[0-9]{9}".prop_map(|subscriber| format!("+254{subscriber}"))
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
