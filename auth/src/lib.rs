//! # Faith Connect Sign-in
//!
//! One-time-passcode sign-in for Faith Connect, built on the Faith Connect
//! reducer/store architecture.
//!
//! ## Features
//!
//! - **Contact validation**: email and regional phone rules, checked before
//!   any network call
//! - **Code entry**: slot buffer with paste, backspace and focus handling
//! - **Resend cooldown**: countdown driven by delayed tick effects
//! - **Stale-response guards**: superseded service answers never touch state
//! - **Testable**: the whole flow runs against in-memory mocks
//!
//! ## Architecture
//!
//! ```text
//! Action → Reducer → (State, Effects) → Effect Execution → More Actions
//! ```
//!
//! [`OtpFlowController`] wraps the store and turns each command into an
//! awaited `Result`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use faith_connect_auth::*;
//!
//! let identity = HttpIdentityService::new(&IdentityServiceConfig::from_env())?;
//! let env = OtpEnvironment::new(
//!     identity,
//!     InMemoryChallengeStore::new(),
//!     InMemorySessionStore::new(),
//! );
//! let controller = OtpFlowController::new(OtpConfig::default(), env);
//!
//! controller.start_challenge("amina@example.com", ContactMethod::Email).await?;
//! let outcome = controller.submit_code("482913").await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod autofill;
pub mod code_entry;
pub mod config;
pub mod constants;
pub mod controller;
pub mod environment;
pub mod error;
pub mod providers;
pub mod reducers;
pub mod state;
pub mod stores;
pub mod utils;
pub mod validation;

// Mocks for testing (available with test-utils feature or in tests)
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::{OtpAction, Settlement};
pub use autofill::{AutofillSource, ChannelAutofill, QueryStringAutofill};
pub use code_entry::{CodeEntryState, EntryEvent, EntrySignal};
pub use config::{IdentityServiceConfig, OtpConfig};
pub use controller::OtpFlowController;
pub use environment::OtpEnvironment;
pub use error::{OtpError, Recovery, Result};
pub use providers::{ChallengeRepository, HttpIdentityService, IdentityService, SessionStore};
pub use reducers::OtpFlowReducer;
pub use state::{
    AccountHandoff, ContactMethod, FlowPhase, OtpChallenge, OtpState, StatusMessage, UserId,
    UserRecord, UserType, VerifyOutcome,
};
pub use stores::{InMemoryChallengeStore, InMemorySessionStore};
pub use validation::{ContactRule, ContactValidator, EmailRule, PhoneRule};
