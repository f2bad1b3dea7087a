//! Login form checks run before any request is sent.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    #[error("username is required")]
    MissingUsername,
    #[error("username must be an email address")]
    InvalidEmail,
    #[error("secret is required")]
    MissingSecret,
}

/// Lightweight email sanity check.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// # Errors
/// Returns the first problem found, username before secret.
pub fn validate_login(username: &str, secret: &str) -> Result<(), FormError> {
    if username.trim().is_empty() {
        return Err(FormError::MissingUsername);
    }
    if !valid_email(username) {
        return Err(FormError::InvalidEmail);
    }
    if secret.is_empty() {
        return Err(FormError::MissingSecret);
    }
    Ok(())
}
