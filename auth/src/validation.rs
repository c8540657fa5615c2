//! Contact identifier validation.
//!
//! Contacts are checked client-side before any network call. Each method has
//! one [`ContactRule`]; the phone rule is per region and injected through
//! [`ContactValidator`], so a deployment outside Kenya swaps the rule rather
//! than the flow.

use crate::constants::messages;
use crate::error::{OtpError, Result};
use crate::state::ContactMethod;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};

#[allow(clippy::expect_used)] // Literal pattern
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email pattern")
});

/// Format rule for one contact method.
pub trait ContactRule: Send + Sync + fmt::Debug {
    /// Method this rule applies to.
    fn method(&self) -> ContactMethod;

    /// Canonical form sent to the identity service.
    fn normalize(&self, raw: &str) -> String;

    /// Check an already normalised contact.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::InvalidContact`] with a user-facing reason.
    fn validate(&self, contact: &str) -> Result<()>;
}

/// `local@domain.tld` with no consecutive dots and no trailing dot.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailRule;

impl ContactRule for EmailRule {
    fn method(&self) -> ContactMethod {
        ContactMethod::Email
    }

    fn normalize(&self, raw: &str) -> String {
        raw.trim().to_string()
    }

    fn validate(&self, contact: &str) -> Result<()> {
        if EMAIL_REGEX.is_match(contact) && !contact.contains("..") && !contact.ends_with('.') {
            Ok(())
        } else {
            Err(OtpError::InvalidContact {
                reason: messages::INVALID_EMAIL.to_string(),
            })
        }
    }
}

/// One country code followed by a fixed number of ASCII subscriber digits.
#[derive(Debug, Clone)]
pub struct PhoneRule {
    /// Adjective used in the error message, e.g. "Kenyan".
    region: String,
    /// Example number shown in the error message.
    example: String,
    pattern: Regex,
}

impl PhoneRule {
    /// Create a rule for an arbitrary region.
    ///
    /// `country_code` includes the plus sign, e.g. "+254".
    ///
    /// # Panics
    ///
    /// Panics if `subscriber_digits` exceeds the regex size limit.
    #[must_use]
    #[allow(clippy::expect_used)] // Escaped prefix plus a bounded digit class
    pub fn new(
        region: impl Into<String>,
        country_code: impl Into<String>,
        subscriber_digits: usize,
        example: impl Into<String>,
    ) -> Self {
        let country_code: String = country_code.into();
        let pattern = format!(
            "^{}[0-9]{{{subscriber_digits}}}$",
            regex::escape(&country_code)
        );
        Self {
            region: region.into(),
            example: example.into(),
            pattern: Regex::new(&pattern).expect("valid phone pattern"),
        }
    }

    /// Adjective used in the error message.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Kenyan mobile numbers: `+254` and nine digits.
    #[must_use]
    pub fn kenya() -> Self {
        Self::new("Kenyan", "+254", 9, "+254712345678")
    }
}

impl ContactRule for PhoneRule {
    fn method(&self) -> ContactMethod {
        ContactMethod::Phone
    }

    fn normalize(&self, raw: &str) -> String {
        raw.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn validate(&self, contact: &str) -> Result<()> {
        if self.pattern.is_match(contact) {
            Ok(())
        } else {
            Err(OtpError::InvalidContact {
                reason: format!(
                    "Please enter a valid {} phone number (e.g., {})",
                    self.region, self.example
                ),
            })
        }
    }
}

/// One rule per contact method.
#[derive(Debug, Clone)]
pub struct ContactValidator {
    email: Arc<dyn ContactRule>,
    phone: Arc<dyn ContactRule>,
}

impl ContactValidator {
    /// Validator with explicit rules.
    #[must_use]
    pub fn new(email: Arc<dyn ContactRule>, phone: Arc<dyn ContactRule>) -> Self {
        Self { email, phone }
    }

    /// Replace the phone rule.
    #[must_use]
    pub fn with_phone_rule(mut self, rule: impl ContactRule + 'static) -> Self {
        self.phone = Arc::new(rule);
        self
    }

    /// Normalise and validate `raw` for `method`.
    ///
    /// # Errors
    ///
    /// - [`OtpError::EmptyContact`] for blank input
    /// - [`OtpError::InvalidContact`] when the method's rule rejects it
    pub fn check(&self, raw: &str, method: ContactMethod) -> Result<String> {
        if raw.trim().is_empty() {
            return Err(OtpError::EmptyContact { method });
        }

        let rule = match method {
            ContactMethod::Email => &self.email,
            ContactMethod::Phone => &self.phone,
        };

        let contact = rule.normalize(raw);
        rule.validate(&contact)?;
        Ok(contact)
    }
}

impl Default for ContactValidator {
    fn default() -> Self {
        Self::new(Arc::new(EmailRule), Arc::new(PhoneRule::kenya()))
    }
}
