//! Identity service trait and wire types.
//!
//! The identity service is the sole source of truth for code validity and
//! account state. It issues codes, verifies them and reports whether the
//! contact belongs to an onboarded account.
//!
//! The send endpoint speaks camelCase; verify and resend speak snake_case.

use crate::error::Result;
use crate::state::{ContactMethod, SessionTokens, UserId, UserRecord};
use serde::{Deserialize, Serialize};

/// Request a code for a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendCodeRequest {
    /// Email address or phone number.
    pub contact: String,
    /// Delivery method.
    pub method: ContactMethod,
}

/// Response to [`SendCodeRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendCodeResponse {
    /// Code dispatched.
    pub success: bool,
    /// Account already associated with the contact.
    pub user_id: Option<UserId>,
    /// Contact has no fully onboarded account.
    pub requires_profile_completion: Option<bool>,
    /// Service message.
    pub message: Option<String>,
    /// Code echoed back by development deployments.
    pub otp: Option<String>,
}

/// Verify a submitted code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyCodeRequest {
    /// Contact the code was sent to.
    pub contact: String,
    /// Submitted code.
    pub otp: String,
    /// Delivery method.
    pub method: ContactMethod,
    /// Account id, if known.
    pub user_id: Option<UserId>,
}

/// Response to [`VerifyCodeRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyCodeResponse {
    /// Code accepted.
    pub success: bool,
    /// Contact must complete a profile.
    pub requires_profile_completion: Option<bool>,
    /// Contact had no account before this verification.
    pub is_new_user: Option<bool>,
    /// Profile of an existing user.
    pub user: Option<UserRecord>,
    /// Login tokens of an existing user.
    pub tokens: Option<SessionTokens>,
    /// Account id issued or confirmed by the service.
    pub user_id: Option<UserId>,
    /// Service message.
    pub message: Option<String>,
}

/// Interpretation of a [`VerifyCodeResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyVerdict {
    /// Code accepted; the contact needs an account.
    NewAccount {
        /// Newly issued account id
        user_id: Option<UserId>,
    },
    /// Code accepted for an existing account.
    Login {
        /// Profile
        user: UserRecord,
        /// Tokens
        tokens: SessionTokens,
    },
    /// Code wrong or expired.
    Rejected {
        /// Service message
        message: Option<String>,
    },
    /// `success` without either a new-account flag or user and tokens.
    Incomplete,
}

impl VerifyCodeResponse {
    /// Classify the response.
    ///
    /// The new-account flags win over an attached user record.
    #[must_use]
    pub fn verdict(self) -> VerifyVerdict {
        if !self.success {
            return VerifyVerdict::Rejected {
                message: self.message,
            };
        }

        if self.requires_profile_completion == Some(true) || self.is_new_user == Some(true) {
            return VerifyVerdict::NewAccount {
                user_id: self.user_id,
            };
        }

        match (self.user, self.tokens) {
            (Some(user), Some(tokens)) => VerifyVerdict::Login { user, tokens },
            _ => VerifyVerdict::Incomplete,
        }
    }
}

/// Re-issue a code for the same contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResendCodeRequest {
    /// Contact the code goes to.
    pub identifier: String,
    /// Delivery method.
    pub auth_method: ContactMethod,
}

/// Response to [`ResendCodeRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResendCodeResponse {
    /// Code dispatched.
    pub success: bool,
    /// Account id, if the service reports one.
    pub user_id: Option<UserId>,
    /// Service message.
    pub message: Option<String>,
}

/// Identity verification service.
///
/// A response with `success == false` is a service-level answer and comes
/// back as `Ok`; `Err` is reserved for transport failures and malformed
/// responses.
pub trait IdentityService: Send + Sync {
    /// Issue a code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OtpError::Transport`] if the service is unreachable
    /// or answers with something that is not a send response.
    fn send_code(
        &self,
        request: SendCodeRequest,
    ) -> impl std::future::Future<Output = Result<SendCodeResponse>> + Send;

    /// Verify a code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OtpError::Transport`] on transport failure.
    fn verify_code(
        &self,
        request: VerifyCodeRequest,
    ) -> impl std::future::Future<Output = Result<VerifyCodeResponse>> + Send;

    /// Re-issue a code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OtpError::Transport`] on transport failure.
    fn resend_code(
        &self,
        request: ResendCodeRequest,
    ) -> impl std::future::Future<Output = Result<ResendCodeResponse>> + Send;
}
