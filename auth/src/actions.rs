//! OTP flow actions.
//!
//! Actions are either commands (user intent, usually sent by
//! [`crate::controller::OtpFlowController`]) or events (results of effects,
//! fed back into the reducer by the store).
//!
//! Every command a caller awaits carries a `correlation_id`. The reducer
//! answers it with exactly one [`OtpAction::Settled`] event carrying the same
//! id.

use crate::code_entry::EntryEvent;
use crate::error::Result;
use crate::providers::{ResendCodeResponse, SendCodeResponse, VerifyCodeResponse};
use crate::state::{ContactMethod, Generation, OtpChallenge, UserRecord, VerifyOutcome};
use uuid::Uuid;

/// Final answer to an awaited command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Start, restore and resend answer with the (updated) challenge.
    Challenge(OtpChallenge),
    /// Submit answers with the verification outcome.
    Verified(VerifyOutcome),
}

impl Settlement {
    /// Unwrap a challenge settlement.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OtpError::Runtime`] for any other settlement.
    pub fn into_challenge(self) -> Result<OtpChallenge> {
        match self {
            Self::Challenge(challenge) => Ok(challenge),
            Self::Verified(outcome) => Err(crate::OtpError::Runtime(format!(
                "expected a challenge, got {outcome:?}"
            ))),
        }
    }

    /// Unwrap a verification settlement.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OtpError::Runtime`] for any other settlement.
    pub fn into_outcome(self) -> Result<VerifyOutcome> {
        match self {
            Self::Verified(outcome) => Ok(outcome),
            Self::Challenge(challenge) => Err(crate::OtpError::Runtime(format!(
                "expected a verification outcome, got challenge for {}",
                challenge.masked_contact()
            ))),
        }
    }
}

/// OTP flow actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════════════════

    /// Validate a contact and ask the identity service for a code.
    StartChallenge {
        /// Correlates the eventual `Settled` event
        correlation_id: Uuid,
        /// Raw contact as typed
        contact: String,
        /// Delivery method
        method: ContactMethod,
    },

    /// Recover the active challenge from the challenge repository.
    RestoreChallenge {
        /// Correlates the eventual `Settled` event
        correlation_id: Uuid,
    },

    /// Key, paste or focus event from the code-entry widget.
    Entry(EntryEvent),

    /// Code from an autofill source.
    Autofill {
        /// Candidate code
        code: String,
    },

    /// Verify a code.
    SubmitCode {
        /// Correlates the eventual `Settled` event
        correlation_id: Uuid,
        /// Code to verify
        code: String,
    },

    /// Re-issue the code for the active challenge.
    Resend {
        /// Correlates the eventual `Settled` event
        correlation_id: Uuid,
    },

    /// One-second resend countdown tick.
    Tick {
        /// Countdown the tick belongs to
        tick_generation: u64,
    },

    /// Abandon the flow.
    Cancel,

    /// Give up waiting for an awaited command.
    ///
    /// If the command's call is still outstanding, the flow returns to the
    /// step it was issued from and the late response is discarded.
    Abandon {
        /// Command to give up on
        correlation_id: Uuid,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════

    /// Identity service answered a send request.
    CodeSent {
        /// Originating command
        correlation_id: Uuid,
        /// Generation the request was issued under
        generation: Generation,
        /// Normalised contact
        contact: String,
        /// Delivery method
        method: ContactMethod,
        /// Service answer
        result: Result<SendCodeResponse>,
    },

    /// Challenge repository answered a restore request.
    ChallengeLoaded {
        /// Originating command
        correlation_id: Uuid,
        /// Generation the request was issued under
        generation: Generation,
        /// Stored challenge, if any
        result: Result<Option<OtpChallenge>>,
    },

    /// Identity service answered a verify request.
    VerifyResponded {
        /// Originating command
        correlation_id: Uuid,
        /// Generation the request was issued under
        generation: Generation,
        /// Service answer
        result: Result<VerifyCodeResponse>,
    },

    /// Identity service answered a resend request.
    ResendResponded {
        /// Originating command
        correlation_id: Uuid,
        /// Generation the request was issued under
        generation: Generation,
        /// Service answer
        result: Result<ResendCodeResponse>,
    },

    /// Session store write after an existing-user login finished.
    LoginStored {
        /// Originating command
        correlation_id: Uuid,
        /// Generation the login happened under
        generation: Generation,
        /// Logged-in profile
        user: UserRecord,
        /// Outcome of the write
        result: Result<()>,
    },

    /// Final answer to an awaited command.
    Settled {
        /// Originating command
        correlation_id: Uuid,
        /// Outcome
        result: Result<Settlement>,
    },
}

impl OtpAction {
    /// Returns `true` if this is a command (user intent).
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::StartChallenge { .. }
                | Self::RestoreChallenge { .. }
                | Self::Entry(_)
                | Self::Autofill { .. }
                | Self::SubmitCode { .. }
                | Self::Resend { .. }
                | Self::Tick { .. }
                | Self::Cancel
                | Self::Abandon { .. }
        )
    }

    /// Returns `true` if this is an event (effect result).
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }

    /// Correlation id of a `Settled` event.
    #[must_use]
    pub const fn settled_id(&self) -> Option<Uuid> {
        match self {
            Self::Settled { correlation_id, .. } => Some(*correlation_id),
            _ => None,
        }
    }
}
