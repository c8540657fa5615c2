//! OTP flow providers.
//!
//! This module defines traits for the external collaborators of the OTP
//! flow. The reducer depends on these traits; the application injects the
//! concrete implementations through [`crate::environment::OtpEnvironment`].
//!
//! ```text
//!            ┌──────────────────┐
//!            │ OtpFlowReducer   │
//!            └───┬─────┬─────┬──┘
//!                │     │     │
//!      ┌─────────┘     │     └──────────┐
//!      ▼               ▼                ▼
//! IdentityService  ChallengeRepository  SessionStore
//! (send / verify / (get / set / clear)  (login written once
//!  resend codes)                         per flow)
//! ```
//!
//! This enables:
//! - **Testing**: Use mocks (in-memory, deterministic)
//! - **Production**: Use real services (HTTP identity API, Redis)

pub mod challenge_store;
pub mod http_identity;
pub mod identity;
pub mod session;

pub use challenge_store::ChallengeRepository;
pub use http_identity::HttpIdentityService;
pub use identity::{
    IdentityService, ResendCodeRequest, ResendCodeResponse, SendCodeRequest, SendCodeResponse,
    VerifyCodeRequest, VerifyCodeResponse, VerifyVerdict,
};
pub use session::{LoginSession, SessionStore};
