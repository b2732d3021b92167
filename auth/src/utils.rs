//! Input validation helpers.

use crate::error::{AuthError, Result};

/// Basic email shape check.
///
/// Not RFC 5322, just enough to catch obvious typos before touching storage.
///
/// # Examples
///
/// ```
/// use car_rental_auth::utils::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("first.last+tag@sub.example.co.uk"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("@example.com"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }

    let valid_local_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    local.chars().all(valid_local_chars)
        && domain.chars().all(valid_domain_chars)
        && domain.split('.').all(|part| !part.is_empty())
}

/// Reject blank required fields, naming the first one found.
///
/// # Errors
///
/// Returns [`AuthError::Validation`] when any value is empty after trimming.
pub fn require_fields(fields: &[(&str, &str)]) -> Result<()> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(AuthError::Validation(format!("{name} is required"))),
        None => Ok(()),
    }
}

/// Validate an email, with a field-specific message.
///
/// # Errors
///
/// Returns [`AuthError::Validation`] for a malformed address.
pub fn validate_email(email: &str) -> Result<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AuthError::Validation("email is not a valid address".to_string()))
    }
}

/// Minimum password length accepted at registration and on change.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Validate a new password.
///
/// # Errors
///
/// Returns [`AuthError::Validation`] when the password is too short.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
