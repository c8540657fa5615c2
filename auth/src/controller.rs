//! Async facade over the OTP flow store.
//!
//! The controller is what a presentation layer talks to. Each operation
//! sends one command and waits for the matching [`OtpAction::Settled`]
//! event, so callers get a plain `Result` instead of watching actions.
//! Observers read the current state snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! let controller = OtpFlowController::new(OtpConfig::default(), env);
//!
//! let challenge = controller
//!     .start_challenge("+254712345678", ContactMethod::Phone)
//!     .await?;
//!
//! match controller.submit_code("482913").await? {
//!     VerifyOutcome::ExistingUserLogin { user } => navigate(user.landing_route()),
//!     VerifyOutcome::NewAccount { handoff } => navigate(handoff.landing_route()),
//!     VerifyOutcome::Rejected { message } => show(message),
//! }
//! ```

use crate::actions::{OtpAction, Settlement};
use crate::autofill::AutofillSource;
use crate::code_entry::{CodeEntryState, EntryEvent};
use crate::config::OtpConfig;
use crate::environment::OtpEnvironment;
use crate::error::{OtpError, Result};
use crate::providers::{ChallengeRepository, IdentityService, SessionStore};
use crate::reducers::OtpFlowReducer;
use crate::state::{
    AccountHandoff, ContactMethod, FlowPhase, OtpChallenge, OtpState, StatusMessage, UserRecord,
    VerifyOutcome,
};
use faith_connect_runtime::{Store, StoreError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

type FlowStore<I, C, S> =
    Store<OtpState, OtpAction, OtpEnvironment<I, C, S>, OtpFlowReducer<I, C, S>>;

/// Drives one OTP sign-in flow.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct OtpFlowController<I, C, S>
where
    I: IdentityService + Clone + 'static,
    C: ChallengeRepository + Clone + 'static,
    S: SessionStore + Clone + 'static,
{
    store: FlowStore<I, C, S>,
    config: OtpConfig,
}

impl<I, C, S> OtpFlowController<I, C, S>
where
    I: IdentityService + Clone + 'static,
    C: ChallengeRepository + Clone + 'static,
    S: SessionStore + Clone + 'static,
{
    /// Create a controller in the `Idle` phase.
    #[must_use]
    pub fn new(config: OtpConfig, environment: OtpEnvironment<I, C, S>) -> Self {
        let reducer = OtpFlowReducer::new(config.clone());
        let store = Store::new(reducer.initial_state(), reducer, environment);
        Self { store, config }
    }

    /// Send a command and wait for its settlement.
    ///
    /// When `response_timeout` passes first, the command is abandoned: an
    /// outstanding call settles as [`OtpError::Transport`] and its late
    /// response is discarded.
    async fn request(&self, make: impl FnOnce(Uuid) -> OtpAction) -> Result<Settlement> {
        let correlation_id = Uuid::new_v4();
        let is_settlement = move |action: &OtpAction| action.settled_id() == Some(correlation_id);

        let settled = match self
            .store
            .send_and_wait_for(make(correlation_id), is_settlement, self.config.response_timeout)
            .await
        {
            Err(StoreError::Timeout) => {
                tracing::warn!(%correlation_id, "No settlement in time, abandoning request");
                self.store
                    .send_and_wait_for(
                        OtpAction::Abandon { correlation_id },
                        is_settlement,
                        self.config.response_timeout,
                    )
                    .await?
            },
            other => other?,
        };

        match settled {
            OtpAction::Settled { result, .. } => result,
            other => Err(OtpError::Runtime(format!(
                "unexpected settlement action: {other:?}"
            ))),
        }
    }

    /// Validate the contact and ask the identity service for a code.
    ///
    /// Any running flow is superseded.
    ///
    /// # Errors
    ///
    /// - [`OtpError::EmptyContact`] / [`OtpError::InvalidContact`]: rejected
    ///   locally, nothing was sent.
    /// - [`OtpError::DispatchFailed`]: the service refused.
    /// - [`OtpError::Transport`]: the service could not be reached.
    /// - [`OtpError::Superseded`]: another start or a cancel overtook this one.
    #[tracing::instrument(skip(self, contact), fields(%method))]
    pub async fn start_challenge(
        &self,
        contact: &str,
        method: ContactMethod,
    ) -> Result<OtpChallenge> {
        let contact = contact.to_string();
        self.request(|correlation_id| OtpAction::StartChallenge {
            correlation_id,
            contact,
            method,
        })
        .await?
        .into_challenge()
    }

    /// Recover the active challenge after a reload.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::StaleChallenge`] when nothing is stored; the caller
    /// should send the user back to contact entry.
    pub async fn restore_challenge(&self) -> Result<OtpChallenge> {
        self.request(|correlation_id| OtpAction::RestoreChallenge { correlation_id })
            .await?
            .into_challenge()
    }

    /// Verify a code.
    ///
    /// A service rejection is `Ok(VerifyOutcome::Rejected)`; the flow stays
    /// on code entry with an empty buffer.
    ///
    /// # Errors
    ///
    /// - [`OtpError::IncompleteCode`]: wrong length or non-digit characters.
    /// - [`OtpError::VerificationInProgress`]: a verification is in flight.
    /// - [`OtpError::StaleChallenge`]: there is no challenge to verify.
    /// - [`OtpError::Transport`]: the service could not be reached.
    #[tracing::instrument(skip_all)]
    pub async fn submit_code(&self, code: &str) -> Result<VerifyOutcome> {
        let code = code.trim().to_string();
        self.request(|correlation_id| OtpAction::SubmitCode {
            correlation_id,
            code,
        })
        .await?
        .into_outcome()
    }

    /// Re-issue the code.
    ///
    /// # Errors
    ///
    /// - [`OtpError::ResendCooldown`]: the countdown is still running.
    /// - [`OtpError::ResendInProgress`]: a resend is in flight.
    /// - [`OtpError::ResendFailed`]: the service refused.
    /// - [`OtpError::StaleChallenge`]: there is no challenge to resend.
    #[tracing::instrument(skip_all)]
    pub async fn resend(&self) -> Result<OtpChallenge> {
        self.request(|correlation_id| OtpAction::Resend { correlation_id })
            .await?
            .into_challenge()
    }

    /// Abandon the flow and clear the stored challenge.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Runtime`] if the store is shutting down.
    pub async fn cancel(&self) -> Result<()> {
        self.store.send(OtpAction::Cancel).await?;
        Ok(())
    }

    /// Feed a code-entry event.
    ///
    /// Completing the buffer submits automatically; watch [`Self::subscribe`]
    /// or [`Self::phase`] for the result.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Runtime`] if the store is shutting down.
    pub async fn input(&self, event: EntryEvent) -> Result<()> {
        self.store.send(OtpAction::Entry(event)).await?;
        Ok(())
    }

    /// Fill the buffer from an autofill source.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Runtime`] if the store is shutting down.
    pub async fn autofill(&self, code: impl Into<String>) -> Result<()> {
        self.store
            .send(OtpAction::Autofill { code: code.into() })
            .await?;
        Ok(())
    }

    /// Forward codes from `source` until it is exhausted.
    ///
    /// Returns `None` without spawning anything when the source is not
    /// available on this platform.
    pub fn attach_autofill<A: AutofillSource>(&self, mut source: A) -> Option<JoinHandle<()>> {
        if !source.is_available() {
            tracing::debug!("Autofill source unavailable, skipping");
            return None;
        }

        let controller = self.clone();
        Some(tokio::spawn(async move {
            while let Some(code) = source.next_code().await {
                if let Err(error) = controller.autofill(code).await {
                    tracing::debug!(%error, "Autofill stopped");
                    break;
                }
            }
        }))
    }

    /// Current phase.
    pub async fn phase(&self) -> FlowPhase {
        self.store.state(|s| s.phase).await
    }

    /// Seconds until resend is permitted.
    pub async fn remaining_cooldown(&self) -> u32 {
        self.store.state(|s| s.timer.remaining_seconds).await
    }

    /// Latest status message.
    pub async fn message(&self) -> Option<StatusMessage> {
        self.store.state(|s| s.message.clone()).await
    }

    /// Active challenge.
    pub async fn challenge(&self) -> Option<OtpChallenge> {
        self.store.state(|s| s.challenge.clone()).await
    }

    /// Code-entry buffer.
    pub async fn entry(&self) -> CodeEntryState {
        self.store.state(|s| s.entry.clone()).await
    }

    /// Logged-in user, once the flow reached `LoggedIn`.
    pub async fn user(&self) -> Option<UserRecord> {
        self.store.state(|s| s.user.clone()).await
    }

    /// Account-creation hand-off, once the flow reached `NewAccount`.
    pub async fn handoff(&self) -> Option<AccountHandoff> {
        self.store.state(|s| s.handoff.clone()).await
    }

    /// Full state snapshot.
    pub async fn snapshot(&self) -> OtpState {
        self.store.state(OtpState::clone).await
    }

    /// Observe every effect-produced action.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OtpAction> {
        self.store.subscribe_actions()
    }

    /// Wait for in-flight effects and stop accepting commands.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Runtime`] if effects are still running after
    /// `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.store.shutdown(timeout).await?;
        Ok(())
    }
}
