//! Reducers for the OTP sign-in flow.
//!
//! The flow is a single reducer; entry, timer and verification handling all
//! live in [`otp_flow`] because they share the stale-response guards.

pub mod otp_flow;

pub use otp_flow::OtpFlowReducer;
