//! OTP flow configuration.
//!
//! Configuration values should be provided by the application; the defaults
//! match the hosted Faith Connect deployment.

use crate::constants::{DEFAULT_CODE_LENGTH, DEFAULT_RESEND_COOLDOWN_SECS};
use std::time::Duration;

/// Environment variable holding the identity service base URL.
pub const API_URL_ENV: &str = "FAITH_CONNECT_API_URL";

/// Environment variable holding the HTTP request timeout in seconds.
pub const API_TIMEOUT_ENV: &str = "FAITH_CONNECT_API_TIMEOUT_SECS";

/// OTP flow configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    /// Number of digits in a code.
    ///
    /// Default: 6
    pub code_length: usize,

    /// Seconds before a code may be re-sent.
    ///
    /// Default: 30
    pub resend_cooldown_secs: u32,

    /// How long the controller waits for the flow to answer a command.
    ///
    /// Should exceed the HTTP request timeout. Default: 15 seconds
    pub response_timeout: Duration,
}

impl OtpConfig {
    /// Default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            resend_cooldown_secs: DEFAULT_RESEND_COOLDOWN_SECS,
            response_timeout: Duration::from_secs(15),
        }
    }

    /// Set code length.
    #[must_use]
    pub const fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Set resend cooldown.
    #[must_use]
    pub const fn with_resend_cooldown(mut self, seconds: u32) -> Self {
        self.resend_cooldown_secs = seconds;
        self
    }

    /// Set controller response timeout.
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP identity service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityServiceConfig {
    /// Base URL of the REST API (e.g., "https://api.example.com/api").
    pub base_url: String,

    /// Path of the send endpoint, relative to `base_url`.
    pub send_path: String,

    /// Path of the verify endpoint, relative to `base_url`.
    pub verify_path: String,

    /// Path of the resend endpoint, relative to `base_url`.
    pub resend_path: String,

    /// Per-request timeout.
    ///
    /// Default: 10 seconds
    pub request_timeout: Duration,
}

impl IdentityServiceConfig {
    /// Configuration for the API at `base_url` with default paths.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            send_path: "/auth/send-otp/".to_string(),
            verify_path: "/auth/verify-otp/".to_string(),
            resend_path: "/auth/resend-otp/".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Read `FAITH_CONNECT_API_URL` and `FAITH_CONNECT_API_TIMEOUT_SECS`.
    ///
    /// Missing or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = std::env::var(API_URL_ENV)
            .map(Self::new)
            .unwrap_or_default();

        if let Ok(raw) = std::env::var(API_TIMEOUT_ENV) {
            match raw.parse::<u64>() {
                Ok(secs) => config.request_timeout = Duration::from_secs(secs),
                Err(error) => {
                    tracing::warn!(value = %raw, %error, "Ignoring invalid {API_TIMEOUT_ENV}");
                },
            }
        }

        config
    }

    /// Set endpoint paths.
    #[must_use]
    pub fn with_paths(
        mut self,
        send: impl Into<String>,
        verify: impl Into<String>,
        resend: impl Into<String>,
    ) -> Self {
        self.send_path = send.into();
        self.verify_path = verify.into();
        self.resend_path = resend.into();
        self
    }

    /// Set per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for IdentityServiceConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000/api")
    }
}
