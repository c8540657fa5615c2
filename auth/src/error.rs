//! Error types for the OTP sign-in flow.

use crate::constants::messages;
use crate::state::ContactMethod;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for OTP flow operations.
pub type Result<T> = std::result::Result<T, OtpError>;

/// Error taxonomy for the OTP sign-in flow.
///
/// Every identity-service failure is caught at the flow boundary and turned
/// into one of these values; none of them is fatal to the process. Use
/// [`OtpError::recovery`] to decide whether the user stays on the current
/// step or starts over from contact entry.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpError {
    // ═══════════════════════════════════════════════════════════
    // Validation Errors (client-local, never reach the network)
    // ═══════════════════════════════════════════════════════════

    /// Contact field was left empty.
    #[error("No {method} provided")]
    EmptyContact {
        /// Method the user selected
        method: ContactMethod,
    },

    /// Contact identifier failed the format rule for its method.
    #[error("Invalid contact: {reason}")]
    InvalidContact {
        /// Human-readable reason
        reason: String,
    },

    /// Submitted code is not exactly `expected` decimal digits.
    #[error("Code must be exactly {expected} digits")]
    IncompleteCode {
        /// Configured code length
        expected: usize,
    },

    // ═══════════════════════════════════════════════════════════
    // Identity Service Errors
    // ═══════════════════════════════════════════════════════════

    /// Identity service refused or failed to send a code.
    #[error("Failed to send code: {message}")]
    DispatchFailed {
        /// Service-provided or default message
        message: String,
    },

    /// Identity service refused or failed to re-issue a code.
    #[error("Failed to resend code: {message}")]
    ResendFailed {
        /// Service-provided or default message
        message: String,
    },

    /// Network failure or malformed response.
    #[error("Transport error: {message}")]
    Transport {
        /// Underlying failure description (not shown to users)
        message: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Flow Errors
    // ═══════════════════════════════════════════════════════════

    /// No recoverable challenge for the verification step.
    #[error("No active challenge")]
    StaleChallenge,

    /// Resend requested before the cooldown elapsed.
    #[error("Resend available in {remaining_seconds}s")]
    ResendCooldown {
        /// Seconds left on the timer
        remaining_seconds: u32,
    },

    /// A verification call is already outstanding.
    #[error("Verification already in progress")]
    VerificationInProgress,

    /// A resend call is already outstanding.
    #[error("Resend already in progress")]
    ResendInProgress,

    /// Response arrived for a challenge that was cancelled or replaced.
    #[error("Request superseded by a newer challenge")]
    Superseded,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Challenge repository or session store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Store runtime failure (shutdown, timeout, closed channel).
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Where the user goes after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Stay on the current step and re-enter input.
    RetryEntry,
    /// Return to contact entry and start a new challenge.
    RestartFlow,
}

impl OtpError {
    /// Returns `true` for client-local validation failures.
    ///
    /// # Examples
    ///
    /// ```
    /// # use faith_connect_auth::OtpError;
    /// assert!(OtpError::IncompleteCode { expected: 6 }.is_validation_error());
    /// assert!(!OtpError::StaleChallenge.is_validation_error());
    /// ```
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyContact { .. } | Self::InvalidContact { .. } | Self::IncompleteCode { .. }
        )
    }

    /// Recovery path for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// # use faith_connect_auth::{OtpError, error::Recovery};
    /// assert_eq!(OtpError::StaleChallenge.recovery(), Recovery::RestartFlow);
    /// assert_eq!(
    ///     OtpError::Transport { message: "timeout".into() }.recovery(),
    ///     Recovery::RetryEntry
    /// );
    /// ```
    #[must_use]
    pub const fn recovery(&self) -> Recovery {
        match self {
            Self::StaleChallenge | Self::Superseded | Self::Storage(_) | Self::Runtime(_) => {
                Recovery::RestartFlow
            },
            _ => Recovery::RetryEntry,
        }
    }

    /// Short message describing the problem class, safe to show to users.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyContact { method } => messages::enter_contact(method.as_str()),
            Self::InvalidContact { reason } => reason.clone(),
            Self::IncompleteCode { expected } => {
                format!("Please enter the complete {expected}-digit code")
            },
            Self::DispatchFailed { message } | Self::ResendFailed { message } => message.clone(),
            Self::StaleChallenge => messages::NO_CHALLENGE.to_string(),
            Self::ResendCooldown { remaining_seconds } => {
                format!("Please wait {remaining_seconds}s before requesting a new code")
            },
            Self::VerificationInProgress => "Verification already in progress".to_string(),
            Self::ResendInProgress => "A new code is already on its way".to_string(),
            Self::Superseded => "This request was cancelled".to_string(),
            Self::Transport { .. } | Self::Storage(_) | Self::Runtime(_) => {
                messages::GENERIC_FAILURE.to_string()
            },
        }
    }
}

impl From<faith_connect_runtime::StoreError> for OtpError {
    fn from(error: faith_connect_runtime::StoreError) -> Self {
        Self::Runtime(error.to_string())
    }
}
