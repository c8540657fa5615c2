//! OTP flow constants.
//!
//! This module contains constant values used throughout the sign-in flow.

/// Default number of digits in a one-time passcode.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Default resend cooldown in seconds.
pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 30;

/// User-facing messages surfaced through `StatusMessage`.
pub mod messages {
    /// Verification accepted for an existing account.
    pub const WELCOME_BACK: &str = "Welcome back!";

    /// Verification accepted for a contact without a completed profile.
    pub const CREATE_ACCOUNT: &str = "OTP verified! Let's create your account.";

    /// Identity service rejected a code without giving a reason.
    pub const INVALID_CODE: &str = "Invalid OTP. Please try again.";

    /// Identity service failed to dispatch a code without giving a reason.
    pub const SEND_FAILED: &str = "Failed to send OTP";

    /// Identity service failed to re-issue a code without giving a reason.
    pub const RESEND_FAILED: &str = "Failed to resend OTP";

    /// Transport or unexpected failure.
    pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

    /// Verification view opened without a recoverable challenge.
    pub const NO_CHALLENGE: &str = "No OTP data found. Please start over.";

    /// Kenyan phone number format hint.
    pub const INVALID_KENYAN_PHONE: &str =
        "Please enter a valid Kenyan phone number (e.g., +254712345678)";

    /// Malformed email address.
    pub const INVALID_EMAIL: &str = "Please enter a valid email address";

    /// Code sent confirmation, e.g. "OTP sent to your email".
    #[must_use]
    pub fn code_sent(method: &str) -> String {
        format!("OTP sent to your {method}")
    }

    /// Code re-sent confirmation, e.g. "OTP resent to your phone".
    #[must_use]
    pub fn code_resent(method: &str) -> String {
        format!("OTP resent to your {method}")
    }

    /// Empty contact field, e.g. "Please enter your email".
    #[must_use]
    pub fn enter_contact(method: &str) -> String {
        format!("Please enter your {method}")
    }
}

/// Landing routes handed to the presentation layer after a terminal transition.
pub mod routes {
    /// Home page for community members.
    pub const HOME: &str = "/";

    /// Business dashboard for business accounts.
    pub const MANAGE_BUSINESS: &str = "/manage-business";

    /// Account creation entry point for new contacts.
    pub const USER_TYPE_SELECTION: &str = "/user-type-selection";
}

/// Key prefixes for persisted flow state.
pub mod keys {
    /// Active challenge, suffixed with the browser session key.
    pub const CHALLENGE_PREFIX: &str = "otp_challenge:";

    /// Logged-in session, suffixed with the browser session key.
    pub const SESSION_PREFIX: &str = "otp_session:";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_templates() {
        assert_eq!(messages::code_sent("email"), "OTP sent to your email");
        assert_eq!(messages::code_resent("phone"), "OTP resent to your phone");
        assert_eq!(messages::enter_contact("phone"), "Please enter your phone");
    }

    #[test]
    fn test_key_format() {
        let key = format!("{}{}", keys::CHALLENGE_PREFIX, "tab-1");
        assert_eq!(key, "otp_challenge:tab-1");
    }
}
