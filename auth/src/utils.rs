//! Utility functions for the OTP flow.

use crate::state::ContactMethod;

/// Hide most of a contact identifier for display and logging.
///
/// Emails keep the first two characters of the local part; phone numbers
/// keep the first and last three characters. Values too short to mask are
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use faith_connect_auth::state::ContactMethod;
/// use faith_connect_auth::utils::mask_contact;
///
/// assert_eq!(mask_contact("jonathan@example.com", ContactMethod::Email), "jo******@example.com");
/// assert_eq!(mask_contact("+254712345678", ContactMethod::Phone), "+25*******678");
/// ```
#[must_use]
pub fn mask_contact(contact: &str, method: ContactMethod) -> String {
    match method {
        ContactMethod::Email => {
            let Some((username, domain)) = contact.split_once('@') else {
                return contact.to_string();
            };
            let length = username.chars().count();
            if length <= 2 {
                return contact.to_string();
            }

            let visible: String = username.chars().take(2).collect();
            format!("{visible}{}@{domain}", "*".repeat(length - 2))
        },
        ContactMethod::Phone => {
            let chars: Vec<char> = contact.chars().collect();
            if chars.len() <= 6 {
                return contact.to_string();
            }

            let head: String = chars[..3].iter().collect();
            let tail: String = chars[chars.len() - 3..].iter().collect();
            format!("{head}{}{tail}", "*".repeat(chars.len() - 6))
        },
    }
}
