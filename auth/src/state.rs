//! OTP flow state types.
//!
//! This module defines the state managed by the OTP flow reducer: the
//! in-flight challenge, the digit buffer, the resend countdown and the
//! terminal outcome handed to the rest of the application.

use crate::constants::routes;
use crate::utils::mask_contact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

pub use crate::code_entry::CodeEntryState;

/// How a code is delivered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    /// Code sent by email.
    Email,
    /// Code sent by SMS.
    Phone,
}

impl ContactMethod {
    /// Wire name of the method (`"email"` or `"phone"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque account identifier issued by the identity service.
///
/// The service reports ids either as JSON strings or integers; both are
/// accepted from human-readable formats and normalised to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a user id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Lenient {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        // Binary formats (bincode) cannot drive an untagged enum.
        if !deserializer.is_human_readable() {
            return String::deserialize(deserializer).map(Self);
        }

        Ok(match Lenient::deserialize(deserializer)? {
            Lenient::Text(id) => Self(id),
            Lenient::Unsigned(id) => Self(id.to_string()),
            Lenient::Signed(id) => Self(id.to_string()),
        })
    }
}

/// Challenge generation.
///
/// Bumped whenever a challenge is started or cancelled. Service responses
/// carry the generation they were issued under and are ignored once it no
/// longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    /// The following generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// One in-flight verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    /// Email address or normalised international phone number.
    pub contact: String,

    /// Delivery method.
    pub method: ContactMethod,

    /// Account id, once the identity service has associated one.
    pub user_id: Option<UserId>,

    /// `true` when the contact has no fully onboarded account yet.
    pub requires_profile_completion: bool,

    /// When the current code was issued. Display only.
    pub issued_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// Contact with most characters hidden, for display and logs.
    #[must_use]
    pub fn masked_contact(&self) -> String {
        mask_contact(&self.contact, self.method)
    }
}

/// Countdown gating re-issuance of a code.
///
/// Each running countdown is identified by `tick_generation`; restarting or
/// stopping the timer bumps it so ticks scheduled for an older countdown
/// are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendTimer {
    /// Seconds until resend is permitted.
    pub remaining_seconds: u32,

    /// Value the countdown restarts from.
    pub cooldown_seconds: u32,

    /// Identifies the running countdown.
    pub tick_generation: u64,
}

impl ResendTimer {
    /// Stopped timer with the given cooldown.
    #[must_use]
    pub const fn new(cooldown_seconds: u32) -> Self {
        Self {
            remaining_seconds: 0,
            cooldown_seconds,
            tick_generation: 0,
        }
    }

    /// Restart the countdown from the full cooldown.
    ///
    /// Returns the generation the first tick must carry, or `None` when the
    /// cooldown is zero and nothing needs scheduling.
    pub fn restart(&mut self) -> Option<u64> {
        self.tick_generation = self.tick_generation.wrapping_add(1);
        self.remaining_seconds = self.cooldown_seconds;
        (self.remaining_seconds > 0).then_some(self.tick_generation)
    }

    /// Stop the countdown; pending ticks become stale.
    pub fn stop(&mut self) {
        self.tick_generation = self.tick_generation.wrapping_add(1);
        self.remaining_seconds = 0;
    }

    /// Apply a one-second tick.
    ///
    /// Returns `true` if another tick should be scheduled.
    pub fn tick(&mut self, tick_generation: u64) -> bool {
        if tick_generation != self.tick_generation || self.remaining_seconds == 0 {
            return false;
        }
        self.remaining_seconds -= 1;
        self.remaining_seconds > 0
    }

    /// Resend is permitted.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.remaining_seconds == 0
    }
}

/// Where the flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowPhase {
    /// No challenge.
    #[default]
    Idle,
    /// Challenge exists; waiting for the user to enter the code.
    AwaitingEntry,
    /// Exactly one verify call is outstanding.
    Verifying,
    /// Verified a contact without a completed profile (terminal).
    NewAccount,
    /// Verified an existing account (terminal).
    LoggedIn,
}

impl FlowPhase {
    /// `true` for phases that end this flow.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::NewAccount | Self::LoggedIn)
    }
}

/// Tone of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Positive confirmation.
    Success,
    /// Something went wrong.
    Error,
}

/// Last message for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// Tone.
    pub kind: MessageKind,
    /// Text shown to the user.
    pub text: String,
}

impl StatusMessage {
    /// Success message.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    /// Error message.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

/// Account category reported by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Community member.
    Community,
    /// Business account.
    Business,
    /// Owner of a listed business.
    BusinessOwner,
    /// Anything else the service reports.
    #[serde(other)]
    Unknown,
}

/// Profile of a logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account id.
    pub id: UserId,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Account category.
    #[serde(default)]
    pub user_type: Option<UserType>,
    /// Avatar URL.
    #[serde(default)]
    pub profile_image_url: Option<String>,
    /// Free-form bio.
    #[serde(default)]
    pub bio: Option<String>,
    /// Onboarding finished.
    #[serde(default)]
    pub is_profile_complete: bool,
}

impl UserRecord {
    /// Page the user lands on after login.
    #[must_use]
    pub const fn landing_route(&self) -> &'static str {
        match self.user_type {
            Some(UserType::Business | UserType::BusinessOwner) => routes::MANAGE_BUSINESS,
            _ => routes::HOME,
        }
    }
}

/// Tokens issued on login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Access token.
    pub access: String,
    /// Refresh token.
    #[serde(default)]
    pub refresh: Option<String>,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Hand-off to the account-creation flow after verifying a new contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHandoff {
    /// Verified contact.
    pub contact: String,
    /// Method it was verified through.
    pub method: ContactMethod,
    /// Account id issued by the service, if any.
    pub user_id: Option<UserId>,
}

impl AccountHandoff {
    /// Page the account-creation flow starts on.
    #[must_use]
    pub const fn landing_route(&self) -> &'static str {
        routes::USER_TYPE_SELECTION
    }
}

/// Successful verification outcomes (mutually exclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Contact requires profile completion; proceed to account creation.
    NewAccount {
        /// Data for the account-creation flow
        handoff: AccountHandoff,
    },
    /// Existing user logged in; session stored and challenge cleared.
    ExistingUserLogin {
        /// Logged-in profile
        user: UserRecord,
    },
    /// Code wrong or expired; buffer cleared, challenge preserved.
    Rejected {
        /// Service-provided or default message
        message: String,
    },
}

/// Root state of the OTP flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpState {
    /// Current phase.
    pub phase: FlowPhase,

    /// Current challenge generation.
    pub generation: Generation,

    /// Active challenge, if any.
    pub challenge: Option<OtpChallenge>,

    /// Digit buffer.
    pub entry: CodeEntryState,

    /// Resend countdown.
    pub timer: ResendTimer,

    /// Outstanding start request.
    pub pending_start: Option<Uuid>,

    /// Outstanding verify request.
    pub pending_verify: Option<Uuid>,

    /// Outstanding resend request.
    pub pending_resend: Option<Uuid>,

    /// Last success or error message.
    pub message: Option<StatusMessage>,

    /// Set once a new contact has been verified.
    pub handoff: Option<AccountHandoff>,

    /// Set once an existing user has logged in.
    pub user: Option<UserRecord>,
}

impl OtpState {
    /// Fresh state for the given code length and resend cooldown.
    #[must_use]
    pub fn new(code_length: usize, cooldown_seconds: u32) -> Self {
        Self {
            phase: FlowPhase::Idle,
            generation: Generation::default(),
            challenge: None,
            entry: CodeEntryState::new(code_length),
            timer: ResendTimer::new(cooldown_seconds),
            pending_start: None,
            pending_verify: None,
            pending_resend: None,
            message: None,
            handoff: None,
            user: None,
        }
    }
}

impl Default for OtpState {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_CODE_LENGTH,
            crate::constants::DEFAULT_RESEND_COOLDOWN_SECS,
        )
    }
}
