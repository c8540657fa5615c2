//! OTP flow reducer.
//!
//! Drives one challenge from contact entry to a terminal outcome.
//!
//! # Flow
//!
//! ```text
//! Idle ──StartChallenge──▶ (send) ──CodeSent──▶ AwaitingEntry ◀─┐
//!                                                 │    ▲        │ Resend
//!                                      SubmitCode │    │ reject └────────
//!                                                 ▼    │ / error
//!                                               Verifying
//!                                                 │
//!                              ┌──────────────────┴─────────────┐
//!                              ▼                                ▼
//!                          NewAccount                       LoggedIn
//! ```
//!
//! # Guarantees
//!
//! - At most one verify call is in flight; a second submit is rejected.
//! - The session store is written at most once per challenge, from a single effect.
//! - Resend is refused while the countdown is running, without touching state.
//! - `StartChallenge`, `RestoreChallenge` and `Cancel` bump the generation;
//!   responses from an older generation are discarded and settle as
//!   [`OtpError::Superseded`].
//! - `Abandon` on an outstanding send or verify bumps the generation too, so a
//!   response arriving after the caller gave up never logs anyone in.

use crate::actions::{OtpAction, Settlement};
use crate::code_entry::{CodeEntryState, EntrySignal};
use crate::config::OtpConfig;
use crate::constants::messages;
use crate::environment::OtpEnvironment;
use crate::error::{OtpError, Result};
use crate::providers::{
    ChallengeRepository, IdentityService, LoginSession, ResendCodeRequest, ResendCodeResponse,
    SendCodeRequest, SendCodeResponse, SessionStore, VerifyCodeRequest, VerifyCodeResponse,
    VerifyVerdict,
};
use crate::state::{
    AccountHandoff, ContactMethod, FlowPhase, Generation, OtpChallenge, OtpState, StatusMessage,
    UserRecord, VerifyOutcome,
};
use faith_connect_core::effect::Effect;
use faith_connect_core::reducer::Reducer;
use faith_connect_core::{SmallVec, async_effect, delay, smallvec};
use std::time::Duration;
use uuid::Uuid;

type Effects = SmallVec<[Effect<OtpAction>; 4]>;

/// Answer an awaited command.
///
/// Always emitted through a future so the store broadcasts it.
fn settle(correlation_id: Uuid, result: Result<Settlement>) -> Effect<OtpAction> {
    async_effect! {
        Some(OtpAction::Settled { correlation_id, result })
    }
}

fn tick(tick_generation: u64) -> Effect<OtpAction> {
    delay! {
        duration: Duration::from_secs(1),
        action: OtpAction::Tick { tick_generation }
    }
}

/// OTP flow reducer.
#[derive(Clone)]
pub struct OtpFlowReducer<I, C, S> {
    config: OtpConfig,
    /// Phantom data to hold type parameters.
    _phantom: std::marker::PhantomData<(I, C, S)>,
}

impl<I, C, S> OtpFlowReducer<I, C, S> {
    /// Create a reducer with the given configuration.
    #[must_use]
    pub const fn new(config: OtpConfig) -> Self {
        Self {
            config,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Initial state matching this reducer's configuration.
    #[must_use]
    pub fn initial_state(&self) -> OtpState {
        OtpState::new(self.config.code_length, self.config.resend_cooldown_secs)
    }

    fn code_is_well_formed(&self, code: &str) -> bool {
        code.chars().count() == self.config.code_length && code.chars().all(|c| c.is_ascii_digit())
    }
}

impl<I, C, S> Default for OtpFlowReducer<I, C, S> {
    fn default() -> Self {
        Self::new(OtpConfig::default())
    }
}

/// Drop the running flow and return to `Idle` under a new generation.
fn reset(state: &mut OtpState, code_length: usize) {
    state.generation = state.generation.next();
    state.phase = FlowPhase::Idle;
    state.challenge = None;
    state.entry = CodeEntryState::new(code_length);
    state.timer.stop();
    state.pending_start = None;
    state.pending_verify = None;
    state.pending_resend = None;
    state.message = None;
    state.handoff = None;
    state.user = None;
}

/// Back to code entry with an empty buffer after a failed verification.
fn back_to_entry(state: &mut OtpState, message: String) {
    state.phase = FlowPhase::AwaitingEntry;
    state.entry.set_disabled(false);
    state.entry.clear();
    state.message = Some(StatusMessage::error(message));
}

impl<I, C, S> OtpFlowReducer<I, C, S>
where
    I: IdentityService + Clone + 'static,
    C: ChallengeRepository + Clone + 'static,
    S: SessionStore + Clone + 'static,
{
    fn start(
        &self,
        state: &mut OtpState,
        correlation_id: Uuid,
        raw_contact: &str,
        method: ContactMethod,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        let contact = match env.validator.check(raw_contact, method) {
            Ok(contact) => contact,
            Err(error) => {
                tracing::debug!(%method, %error, "Rejected contact before sending");
                state.message = Some(StatusMessage::error(error.user_message()));
                return smallvec![settle(correlation_id, Err(error))];
            },
        };

        reset(state, self.config.code_length);
        state.pending_start = Some(correlation_id);
        let generation = state.generation;

        let identity = env.identity.clone();
        smallvec![async_effect! {
            let result = identity
                .send_code(SendCodeRequest { contact: contact.clone(), method })
                .await;
            Some(OtpAction::CodeSent {
                correlation_id,
                generation,
                contact,
                method,
                result,
            })
        }]
    }

    #[allow(clippy::too_many_arguments)]
    fn code_sent(
        &self,
        state: &mut OtpState,
        correlation_id: Uuid,
        generation: Generation,
        contact: String,
        method: ContactMethod,
        result: Result<SendCodeResponse>,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        if generation != state.generation || state.pending_start != Some(correlation_id) {
            tracing::debug!(?generation, "Discarding stale send response");
            return smallvec![settle(correlation_id, Err(OtpError::Superseded))];
        }
        state.pending_start = None;

        let response = match result {
            Ok(response) if response.success => response,
            Ok(response) => {
                let error = OtpError::DispatchFailed {
                    message: response
                        .message
                        .unwrap_or_else(|| messages::SEND_FAILED.to_string()),
                };
                state.message = Some(StatusMessage::error(error.user_message()));
                return smallvec![settle(correlation_id, Err(error))];
            },
            Err(error) => {
                tracing::warn!(%error, "Sending OTP failed");
                state.message = Some(StatusMessage::error(error.user_message()));
                return smallvec![settle(correlation_id, Err(error))];
            },
        };

        if let Some(otp) = response.otp.as_deref() {
            tracing::debug!(otp, "Identity service echoed the code (development mode)");
        }

        let challenge = OtpChallenge {
            contact,
            method,
            user_id: response.user_id,
            requires_profile_completion: response.requires_profile_completion.unwrap_or(false),
            issued_at: env.clock.now(),
        };
        tracing::info!(
            contact = %challenge.masked_contact(),
            %method,
            requires_profile_completion = challenge.requires_profile_completion,
            "OTP challenge started"
        );

        state.phase = FlowPhase::AwaitingEntry;
        state.challenge = Some(challenge.clone());
        state.entry = CodeEntryState::new(self.config.code_length);
        state.message = Some(StatusMessage::success(messages::code_sent(method.as_str())));

        let mut effects = Self::persist_and_settle(correlation_id, challenge, env);
        if let Some(tick_generation) = state.timer.restart() {
            effects.push(tick(tick_generation));
        }
        effects
    }

    fn restore(
        &self,
        state: &mut OtpState,
        correlation_id: Uuid,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        reset(state, self.config.code_length);
        state.pending_start = Some(correlation_id);
        let generation = state.generation;

        let challenges = env.challenges.clone();
        smallvec![async_effect! {
            let result = challenges.get().await;
            Some(OtpAction::ChallengeLoaded { correlation_id, generation, result })
        }]
    }

    fn challenge_loaded(
        state: &mut OtpState,
        correlation_id: Uuid,
        generation: Generation,
        result: Result<Option<OtpChallenge>>,
    ) -> Effects {
        if generation != state.generation || state.pending_start != Some(correlation_id) {
            return smallvec![settle(correlation_id, Err(OtpError::Superseded))];
        }
        state.pending_start = None;

        let challenge = match result {
            Ok(Some(challenge)) => challenge,
            Ok(None) => {
                tracing::warn!("No OTP challenge to restore");
                state.message = Some(StatusMessage::error(messages::NO_CHALLENGE));
                return smallvec![settle(correlation_id, Err(OtpError::StaleChallenge))];
            },
            Err(error) => {
                tracing::warn!(%error, "Loading OTP challenge failed");
                state.message = Some(StatusMessage::error(error.user_message()));
                return smallvec![settle(correlation_id, Err(error))];
            },
        };

        tracing::debug!(contact = %challenge.masked_contact(), "Restored OTP challenge");
        state.phase = FlowPhase::AwaitingEntry;
        state.challenge = Some(challenge.clone());

        let mut effects: Effects = smallvec![settle(
            correlation_id,
            Ok(Settlement::Challenge(challenge))
        )];
        if let Some(tick_generation) = state.timer.restart() {
            effects.push(tick(tick_generation));
        }
        effects
    }

    fn submit(
        &self,
        state: &mut OtpState,
        correlation_id: Uuid,
        code: String,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        if state.phase == FlowPhase::Verifying || state.pending_verify.is_some() {
            tracing::debug!("Ignoring submit while verification is in flight");
            return smallvec![settle(correlation_id, Err(OtpError::VerificationInProgress))];
        }

        let Some(challenge) = state
            .challenge
            .as_ref()
            .filter(|_| state.phase == FlowPhase::AwaitingEntry)
        else {
            return smallvec![settle(correlation_id, Err(OtpError::StaleChallenge))];
        };

        if !self.code_is_well_formed(&code) {
            let error = OtpError::IncompleteCode {
                expected: self.config.code_length,
            };
            state.message = Some(StatusMessage::error(error.user_message()));
            return smallvec![settle(correlation_id, Err(error))];
        }

        let request = VerifyCodeRequest {
            contact: challenge.contact.clone(),
            otp: code,
            method: challenge.method,
            user_id: challenge.user_id.clone(),
        };

        state.phase = FlowPhase::Verifying;
        state.pending_verify = Some(correlation_id);
        state.entry.set_disabled(true);
        state.message = None;
        let generation = state.generation;

        let identity = env.identity.clone();
        smallvec![async_effect! {
            let result = identity.verify_code(request).await;
            Some(OtpAction::VerifyResponded { correlation_id, generation, result })
        }]
    }

    fn verify_responded(
        &self,
        state: &mut OtpState,
        correlation_id: Uuid,
        generation: Generation,
        result: Result<VerifyCodeResponse>,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        if generation != state.generation || state.pending_verify != Some(correlation_id) {
            tracing::debug!(?generation, "Discarding stale verify response");
            return smallvec![settle(correlation_id, Err(OtpError::Superseded))];
        }
        state.pending_verify = None;

        let verdict = match result {
            Ok(response) => response.verdict(),
            Err(error) => {
                tracing::warn!(%error, "Verifying OTP failed");
                back_to_entry(state, error.user_message());
                return smallvec![settle(correlation_id, Err(error))];
            },
        };

        match verdict {
            VerifyVerdict::Rejected { message } => {
                let message = message.unwrap_or_else(|| messages::INVALID_CODE.to_string());
                tracing::debug!(%message, "OTP rejected");
                back_to_entry(state, message.clone());
                smallvec![settle(
                    correlation_id,
                    Ok(Settlement::Verified(VerifyOutcome::Rejected { message }))
                )]
            },
            VerifyVerdict::Incomplete => {
                let error = OtpError::Transport {
                    message: "verification succeeded without account data".to_string(),
                };
                tracing::warn!(%error, "Malformed verify response");
                back_to_entry(state, error.user_message());
                smallvec![settle(correlation_id, Err(error))]
            },
            VerifyVerdict::NewAccount { user_id } => {
                Self::new_account(state, correlation_id, user_id, env)
            },
            VerifyVerdict::Login { user, tokens } => {
                let session = LoginSession {
                    user: user.clone(),
                    tokens,
                    logged_in_at: env.clock.now(),
                };
                Self::login(state, correlation_id, user, session, env)
            },
        }
    }

    fn new_account(
        state: &mut OtpState,
        correlation_id: Uuid,
        user_id: Option<crate::state::UserId>,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        let Some(challenge) = state.challenge.as_mut() else {
            return smallvec![settle(correlation_id, Err(OtpError::StaleChallenge))];
        };

        if user_id.is_some() {
            challenge.user_id = user_id;
        }
        challenge.requires_profile_completion = true;

        let handoff = AccountHandoff {
            contact: challenge.contact.clone(),
            method: challenge.method,
            user_id: challenge.user_id.clone(),
        };
        let challenge = challenge.clone();
        tracing::info!(
            contact = %challenge.masked_contact(),
            has_user_id = handoff.user_id.is_some(),
            "OTP verified for new account"
        );

        state.phase = FlowPhase::NewAccount;
        state.timer.stop();
        state.handoff = Some(handoff.clone());
        state.message = Some(StatusMessage::success(messages::CREATE_ACCOUNT));

        let challenges = env.challenges.clone();
        smallvec![async_effect! {
            if let Err(error) = challenges.set(&challenge).await {
                tracing::warn!(%error, "Failed to persist challenge for account creation");
            }
            Some(OtpAction::Settled {
                correlation_id,
                result: Ok(Settlement::Verified(VerifyOutcome::NewAccount { handoff })),
            })
        }]
    }

    fn login(
        state: &mut OtpState,
        correlation_id: Uuid,
        user: UserRecord,
        session: LoginSession,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        tracing::info!(user_id = %user.id, "OTP verified for existing user");

        state.phase = FlowPhase::LoggedIn;
        state.challenge = None;
        state.entry.clear();
        state.timer.stop();
        state.user = Some(user.clone());
        state.message = Some(StatusMessage::success(messages::WELCOME_BACK));
        let generation = state.generation;

        let sessions = env.sessions.clone();
        let challenges = env.challenges.clone();
        smallvec![async_effect! {
            let result = sessions.store_login(&session).await;
            if result.is_ok() {
                if let Err(error) = challenges.clear().await {
                    tracing::warn!(%error, "Failed to clear challenge after login");
                }
            }
            Some(OtpAction::LoginStored { correlation_id, generation, user, result })
        }]
    }

    fn login_stored(
        state: &mut OtpState,
        correlation_id: Uuid,
        generation: Generation,
        user: UserRecord,
        result: Result<()>,
    ) -> Effects {
        match result {
            Ok(()) => smallvec![settle(
                correlation_id,
                Ok(Settlement::Verified(VerifyOutcome::ExistingUserLogin { user }))
            )],
            Err(error) => {
                tracing::error!(%error, user_id = %user.id, "Failed to store login session");
                if generation == state.generation && state.phase == FlowPhase::LoggedIn {
                    state.phase = FlowPhase::Idle;
                    state.user = None;
                    state.message = Some(StatusMessage::error(error.user_message()));
                }
                smallvec![settle(correlation_id, Err(error))]
            },
        }
    }

    fn resend(
        state: &mut OtpState,
        correlation_id: Uuid,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        let refusal = match (state.phase, state.challenge.as_ref()) {
            (FlowPhase::Verifying, _) => Some(OtpError::VerificationInProgress),
            (FlowPhase::AwaitingEntry, Some(_)) if state.pending_resend.is_some() => {
                Some(OtpError::ResendInProgress)
            },
            (FlowPhase::AwaitingEntry, Some(_)) if !state.timer.is_ready() => {
                Some(OtpError::ResendCooldown {
                    remaining_seconds: state.timer.remaining_seconds,
                })
            },
            (FlowPhase::AwaitingEntry, Some(_)) => None,
            _ => Some(OtpError::StaleChallenge),
        };
        if let Some(error) = refusal {
            tracing::debug!(%error, "Resend refused");
            return smallvec![settle(correlation_id, Err(error))];
        }

        let Some(challenge) = state.challenge.as_ref() else {
            return smallvec![settle(correlation_id, Err(OtpError::StaleChallenge))];
        };
        let request = ResendCodeRequest {
            identifier: challenge.contact.clone(),
            auth_method: challenge.method,
        };

        state.pending_resend = Some(correlation_id);
        let generation = state.generation;

        let identity = env.identity.clone();
        smallvec![async_effect! {
            let result = identity.resend_code(request).await;
            Some(OtpAction::ResendResponded { correlation_id, generation, result })
        }]
    }

    fn resend_responded(
        &self,
        state: &mut OtpState,
        correlation_id: Uuid,
        generation: Generation,
        result: Result<ResendCodeResponse>,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        if generation != state.generation || state.pending_resend != Some(correlation_id) {
            tracing::debug!(?generation, "Discarding stale resend response");
            return smallvec![settle(correlation_id, Err(OtpError::Superseded))];
        }
        state.pending_resend = None;

        // A verification that finished meanwhile owns the flow now.
        if state.phase.is_terminal() {
            return smallvec![settle(correlation_id, Err(OtpError::Superseded))];
        }

        let response = match result {
            Ok(response) if response.success => response,
            Ok(response) => {
                let error = OtpError::ResendFailed {
                    message: response
                        .message
                        .unwrap_or_else(|| messages::RESEND_FAILED.to_string()),
                };
                state.message = Some(StatusMessage::error(error.user_message()));
                return smallvec![settle(correlation_id, Err(error))];
            },
            Err(error) => {
                tracing::warn!(%error, "Resending OTP failed");
                state.message = Some(StatusMessage::error(error.user_message()));
                return smallvec![settle(correlation_id, Err(error))];
            },
        };

        let Some(challenge) = state.challenge.as_mut() else {
            return smallvec![settle(correlation_id, Err(OtpError::StaleChallenge))];
        };
        if response.user_id.is_some() {
            challenge.user_id = response.user_id;
        }
        challenge.issued_at = env.clock.now();
        let challenge = challenge.clone();

        tracing::info!(contact = %challenge.masked_contact(), "OTP re-sent");
        state.message = Some(StatusMessage::success(messages::code_resent(
            challenge.method.as_str(),
        )));

        let mut effects = Self::persist_and_settle(correlation_id, challenge, env);
        if let Some(tick_generation) = state.timer.restart() {
            effects.push(tick(tick_generation));
        }
        effects
    }

    /// Settle an outstanding command as timed out and unwind its phase.
    ///
    /// Commands already answered (or never issued) are left alone; their own
    /// `Settled` event is on its way.
    fn abandon(state: &mut OtpState, correlation_id: Uuid) -> Effects {
        if state.pending_verify == Some(correlation_id) {
            state.generation = state.generation.next();
            state.pending_verify = None;
            state.pending_resend = None;
            back_to_entry(state, messages::GENERIC_FAILURE.to_string());
        } else if state.pending_start == Some(correlation_id) {
            state.generation = state.generation.next();
            state.pending_start = None;
            state.message = Some(StatusMessage::error(messages::GENERIC_FAILURE));
        } else if state.pending_resend == Some(correlation_id) {
            state.pending_resend = None;
            state.message = Some(StatusMessage::error(messages::GENERIC_FAILURE));
        } else {
            return smallvec![Effect::None];
        }

        tracing::warn!(%correlation_id, phase = ?state.phase, "Abandoned unanswered request");
        smallvec![settle(
            correlation_id,
            Err(OtpError::Transport {
                message: "no response from identity service in time".to_string(),
            })
        )]
    }

    fn entry_signal(
        &self,
        state: &mut OtpState,
        signal: EntrySignal,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        match signal {
            EntrySignal::Completed(code) | EntrySignal::SubmitRequested(code)
                if state.phase == FlowPhase::AwaitingEntry =>
            {
                self.submit(state, Uuid::new_v4(), code, env)
            },
            _ => smallvec![Effect::None],
        }
    }

    fn persist_and_settle(
        correlation_id: Uuid,
        challenge: OtpChallenge,
        env: &OtpEnvironment<I, C, S>,
    ) -> Effects {
        let challenges = env.challenges.clone();
        smallvec![async_effect! {
            if let Err(error) = challenges.set(&challenge).await {
                tracing::warn!(%error, "Failed to persist OTP challenge");
            }
            Some(OtpAction::Settled {
                correlation_id,
                result: Ok(Settlement::Challenge(challenge)),
            })
        }]
    }
}

impl<I, C, S> Reducer for OtpFlowReducer<I, C, S>
where
    I: IdentityService + Clone + 'static,
    C: ChallengeRepository + Clone + 'static,
    S: SessionStore + Clone + 'static,
{
    type State = OtpState;
    type Action = OtpAction;
    type Environment = OtpEnvironment<I, C, S>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            OtpAction::StartChallenge {
                correlation_id,
                contact,
                method,
            } => self.start(state, correlation_id, &contact, method, env),

            OtpAction::CodeSent {
                correlation_id,
                generation,
                contact,
                method,
                result,
            } => self.code_sent(state, correlation_id, generation, contact, method, result, env),

            OtpAction::RestoreChallenge { correlation_id } => {
                self.restore(state, correlation_id, env)
            },

            OtpAction::ChallengeLoaded {
                correlation_id,
                generation,
                result,
            } => Self::challenge_loaded(state, correlation_id, generation, result),

            OtpAction::Entry(event) => {
                if !matches!(state.phase, FlowPhase::AwaitingEntry | FlowPhase::Verifying) {
                    return smallvec![Effect::None];
                }
                let signal = state.entry.apply(event);
                self.entry_signal(state, signal, env)
            },

            OtpAction::Autofill { code } => {
                if state.phase != FlowPhase::AwaitingEntry {
                    tracing::debug!("Ignoring autofill outside code entry");
                    return smallvec![Effect::None];
                }
                let signal = state.entry.fill_exact(code.trim());
                self.entry_signal(state, signal, env)
            },

            OtpAction::SubmitCode {
                correlation_id,
                code,
            } => self.submit(state, correlation_id, code, env),

            OtpAction::VerifyResponded {
                correlation_id,
                generation,
                result,
            } => self.verify_responded(state, correlation_id, generation, result, env),

            OtpAction::LoginStored {
                correlation_id,
                generation,
                user,
                result,
            } => Self::login_stored(state, correlation_id, generation, user, result),

            OtpAction::Resend { correlation_id } => Self::resend(state, correlation_id, env),

            OtpAction::ResendResponded {
                correlation_id,
                generation,
                result,
            } => self.resend_responded(state, correlation_id, generation, result, env),

            OtpAction::Tick { tick_generation } => {
                if state.timer.tick(tick_generation) {
                    smallvec![tick(tick_generation)]
                } else {
                    smallvec![Effect::None]
                }
            },

            OtpAction::Cancel => {
                tracing::debug!(phase = ?state.phase, "OTP flow cancelled");
                reset(state, self.config.code_length);

                let challenges = env.challenges.clone();
                smallvec![async_effect! {
                    if let Err(error) = challenges.clear().await {
                        tracing::warn!(%error, "Failed to clear OTP challenge");
                    }
                    None
                }]
            },

            OtpAction::Abandon { correlation_id } => Self::abandon(state, correlation_id),

            // Observed by callers through the action broadcast.
            OtpAction::Settled { .. } => smallvec![Effect::None],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{MockIdentityService, MockSessionStore};
    use crate::state::{ContactMethod, UserId};
    use crate::stores::InMemoryChallengeStore;
    use faith_connect_core::environment::Clock;
    use faith_connect_testing::{ReducerTest, assertions, test_clock};
    use std::sync::Arc;

    type TestReducer = OtpFlowReducer<MockIdentityService, InMemoryChallengeStore, MockSessionStore>;
    type TestEnv = OtpEnvironment<MockIdentityService, InMemoryChallengeStore, MockSessionStore>;

    fn env() -> TestEnv {
        OtpEnvironment::new(
            MockIdentityService::new(),
            InMemoryChallengeStore::new(),
            MockSessionStore::new(),
        )
        .with_clock(Arc::new(test_clock()))
    }

    fn challenge() -> OtpChallenge {
        OtpChallenge {
            contact: "+254712345678".to_string(),
            method: ContactMethod::Phone,
            user_id: Some(UserId::new("7")),
            requires_profile_completion: false,
            issued_at: chrono::Utc::now(),
        }
    }

    fn awaiting_entry() -> OtpState {
        let mut state = TestReducer::default().initial_state();
        state.phase = FlowPhase::AwaitingEntry;
        state.challenge = Some(challenge());
        state
    }

    fn verifying(correlation_id: Uuid) -> OtpState {
        let mut state = awaiting_entry();
        state.phase = FlowPhase::Verifying;
        state.pending_verify = Some(correlation_id);
        state.entry.set_disabled(true);
        state
    }

    #[test]
    fn invalid_contact_never_reaches_the_network() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(OtpState::default())
            .when_action(OtpAction::StartChallenge {
                correlation_id: Uuid::new_v4(),
                contact: "0712345678".to_string(),
                method: ContactMethod::Phone,
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::Idle);
                assert_eq!(state.generation, Generation(0));
                assert!(state.pending_start.is_none());
                assert_eq!(
                    state.message.as_ref().map(|m| m.text.as_str()),
                    Some(messages::INVALID_KENYAN_PHONE)
                );
            })
            .then_effects(|effects| {
                // Only the settlement future.
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn start_bumps_generation_and_calls_service() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(awaiting_entry())
            .when_action(OtpAction::StartChallenge {
                correlation_id: Uuid::new_v4(),
                contact: "a@b.com".to_string(),
                method: ContactMethod::Email,
            })
            .then_state(|state| {
                assert_eq!(state.generation, Generation(1));
                assert_eq!(state.phase, FlowPhase::Idle);
                assert!(state.challenge.is_none());
                assert!(state.pending_start.is_some());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn code_sent_creates_challenge_and_starts_timer() {
        let correlation_id = Uuid::new_v4();
        let mut state = OtpState::default();
        state.generation = Generation(3);
        state.pending_start = Some(correlation_id);

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(state)
            .when_action(OtpAction::CodeSent {
                correlation_id,
                generation: Generation(3),
                contact: "a@b.com".to_string(),
                method: ContactMethod::Email,
                result: Ok(MockIdentityService::sent(Some("11"), true)),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::AwaitingEntry);
                let challenge = state.challenge.as_ref().unwrap();
                assert!(challenge.requires_profile_completion);
                assert_eq!(challenge.user_id, Some(UserId::new("11")));
                assert_eq!(challenge.issued_at, test_clock().now());
                assert_eq!(state.timer.remaining_seconds, 30);
                assert_eq!(
                    state.message,
                    Some(StatusMessage::success("OTP sent to your email"))
                );
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 2);
                assertions::assert_has_delay_effect(effects);
            })
            .run();
    }

    #[test]
    fn stale_send_response_is_discarded() {
        let correlation_id = Uuid::new_v4();
        let mut state = OtpState::default();
        state.generation = Generation(4);

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(state)
            .when_action(OtpAction::CodeSent {
                correlation_id,
                generation: Generation(3),
                contact: "a@b.com".to_string(),
                method: ContactMethod::Email,
                result: Ok(MockIdentityService::sent(None, false)),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::Idle);
                assert!(state.challenge.is_none());
                assert_eq!(state.timer.remaining_seconds, 0);
            })
            .run();
    }

    #[test]
    fn submit_rejects_short_code_locally() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(awaiting_entry())
            .when_action(OtpAction::SubmitCode {
                correlation_id: Uuid::new_v4(),
                code: "12345".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::AwaitingEntry);
                assert!(state.pending_verify.is_none());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn submit_enters_verifying_and_disables_entry() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(awaiting_entry())
            .when_action(OtpAction::SubmitCode {
                correlation_id: Uuid::new_v4(),
                code: "482913".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::Verifying);
                assert!(state.pending_verify.is_some());
                assert!(state.entry.is_disabled());
            })
            .run();
    }

    #[test]
    fn second_submit_while_verifying_is_refused() {
        let first = Uuid::new_v4();
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(verifying(first))
            .when_action(OtpAction::SubmitCode {
                correlation_id: Uuid::new_v4(),
                code: "482913".to_string(),
            })
            .then_state(move |state| {
                assert_eq!(state.pending_verify, Some(first));
                assert_eq!(state.phase, FlowPhase::Verifying);
            })
            .run();
    }

    #[test]
    fn rejection_clears_buffer_and_keeps_challenge() {
        let correlation_id = Uuid::new_v4();
        let mut state = verifying(correlation_id);
        state.entry.set_disabled(false);
        state.entry.fill_exact("111111");
        state.entry.set_disabled(true);

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(state)
            .when_action(OtpAction::VerifyResponded {
                correlation_id,
                generation: Generation(0),
                result: Ok(MockIdentityService::rejected(None)),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::AwaitingEntry);
                assert!(state.entry.is_empty());
                assert_eq!(state.entry.active_slot(), Some(0));
                assert!(!state.entry.is_disabled());
                assert!(state.challenge.is_some());
                assert_eq!(
                    state.message,
                    Some(StatusMessage::error(messages::INVALID_CODE))
                );
            })
            .run();
    }

    #[test]
    fn transport_error_preserves_challenge() {
        let correlation_id = Uuid::new_v4();
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(verifying(correlation_id))
            .when_action(OtpAction::VerifyResponded {
                correlation_id,
                generation: Generation(0),
                result: Err(OtpError::Transport {
                    message: "connection reset".to_string(),
                }),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::AwaitingEntry);
                assert!(state.challenge.is_some());
                assert_eq!(
                    state.message,
                    Some(StatusMessage::error(messages::GENERIC_FAILURE))
                );
            })
            .run();
    }

    #[test]
    fn new_account_records_handoff() {
        let correlation_id = Uuid::new_v4();
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(verifying(correlation_id))
            .when_action(OtpAction::VerifyResponded {
                correlation_id,
                generation: Generation(0),
                result: Ok(MockIdentityService::new_account(Some("99"))),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::NewAccount);
                let handoff = state.handoff.as_ref().unwrap();
                assert_eq!(handoff.user_id, Some(UserId::new("99")));
                assert_eq!(handoff.landing_route(), "/user-type-selection");
                let challenge = state.challenge.as_ref().unwrap();
                assert_eq!(challenge.user_id, Some(UserId::new("99")));
                assert!(challenge.requires_profile_completion);
            })
            .run();
    }

    #[test]
    fn login_clears_challenge_in_one_effect() {
        let correlation_id = Uuid::new_v4();
        let user: UserRecord = serde_json::from_value(serde_json::json!({
            "id": 7,
            "user_type": "community"
        }))
        .unwrap();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(verifying(correlation_id))
            .when_action(OtpAction::VerifyResponded {
                correlation_id,
                generation: Generation(0),
                result: Ok(MockIdentityService::logged_in(user)),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::LoggedIn);
                assert!(state.challenge.is_none());
                assert_eq!(state.user.as_ref().map(UserRecord::landing_route), Some("/"));
                assert_eq!(state.message, Some(StatusMessage::success("Welcome back!")));
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn abandoned_verification_returns_to_entry() {
        let correlation_id = Uuid::new_v4();
        let user: UserRecord =
            serde_json::from_value(serde_json::json!({ "id": "7" })).unwrap();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(verifying(correlation_id))
            .when_action(OtpAction::Abandon { correlation_id })
            .when_action(OtpAction::VerifyResponded {
                correlation_id,
                generation: Generation(0),
                result: Ok(MockIdentityService::logged_in(user)),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::AwaitingEntry);
                assert_eq!(state.generation, Generation(1));
                assert!(state.pending_verify.is_none());
                assert!(state.user.is_none());
                assert!(state.challenge.is_some());
                assert!(!state.entry.is_disabled());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn abandoning_an_answered_command_changes_nothing() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(awaiting_entry())
            .when_action(OtpAction::Abandon {
                correlation_id: Uuid::new_v4(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::AwaitingEntry);
                assert_eq!(state.generation, Generation(0));
                assert!(state.message.is_none());
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn verify_response_after_cancel_is_ignored() {
        let correlation_id = Uuid::new_v4();
        let user: UserRecord =
            serde_json::from_value(serde_json::json!({ "id": "7" })).unwrap();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(verifying(correlation_id))
            .when_action(OtpAction::Cancel)
            .when_action(OtpAction::VerifyResponded {
                correlation_id,
                generation: Generation(0),
                result: Ok(MockIdentityService::logged_in(user)),
            })
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::Idle);
                assert!(state.user.is_none());
                assert_eq!(state.generation, Generation(1));
            })
            .then_effects(|effects| {
                // Only the Superseded settlement; no session write.
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn resend_during_cooldown_changes_nothing() {
        let mut state = awaiting_entry();
        state.timer.restart();
        let before = state.clone();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(state)
            .when_action(OtpAction::Resend {
                correlation_id: Uuid::new_v4(),
            })
            .then_state(move |state| {
                assert_eq!(state, &before);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn resend_success_resets_timer() {
        let correlation_id = Uuid::new_v4();
        let mut state = awaiting_entry();
        state.pending_resend = Some(correlation_id);

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(state)
            .when_action(OtpAction::ResendResponded {
                correlation_id,
                generation: Generation(0),
                result: Ok(ResendCodeResponse {
                    success: true,
                    user_id: Some(UserId::new("8")),
                    message: None,
                }),
            })
            .then_state(|state| {
                assert_eq!(state.timer.remaining_seconds, 30);
                assert!(state.pending_resend.is_none());
                let challenge = state.challenge.as_ref().unwrap();
                assert_eq!(challenge.user_id, Some(UserId::new("8")));
                assert_eq!(
                    state.message,
                    Some(StatusMessage::success("OTP resent to your phone"))
                );
            })
            .then_effects(|effects| {
                assertions::assert_has_delay_effect(effects);
            })
            .run();
    }

    #[test]
    fn stale_ticks_are_ignored() {
        let mut state = awaiting_entry();
        let tick_generation = state.timer.restart().unwrap();
        state.timer.restart();

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(state)
            .when_action(OtpAction::Tick { tick_generation })
            .then_state(|state| {
                assert_eq!(state.timer.remaining_seconds, 30);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn completing_the_buffer_submits() {
        let mut state = awaiting_entry();
        state.entry.apply(crate::code_entry::EntryEvent::Paste {
            text: "48291".to_string(),
        });

        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(state)
            .when_action(OtpAction::Entry(crate::code_entry::EntryEvent::Type {
                slot: 5,
                ch: '3',
            }))
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::Verifying);
            })
            .then_effects(|effects| {
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn cancel_is_idempotent() {
        ReducerTest::new(TestReducer::default())
            .with_env(env())
            .given_state(awaiting_entry())
            .when_action(OtpAction::Cancel)
            .when_action(OtpAction::Cancel)
            .then_state(|state| {
                assert_eq!(state.phase, FlowPhase::Idle);
                assert!(state.challenge.is_none());
                assert!(state.timer.is_ready());
            })
            .run();
    }
}
