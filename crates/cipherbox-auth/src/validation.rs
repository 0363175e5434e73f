//! Signup input rules.
//!
//! A [`ValidatedEmail`] or [`ValidatedPassword`] can only be obtained by
//! passing the checks below, so whoever holds one has proof for that exact
//! value. Validity is never recorded anywhere else.

use cipherbox_core::error::AppError;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 10;

/// Message for an address that does not look like `local@domain.tld`.
pub const INVALID_EMAIL: &str = "Please enter a valid email";
/// Message for a password under [`MIN_PASSWORD_LENGTH`] characters.
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 10 characters long";
/// Message for a password without an ASCII letter.
pub const PASSWORD_NEEDS_LETTER: &str = "Password must contain at least one letter";

/// An email address that passed [`validate_email`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEmail(String);

impl ValidatedEmail {
    /// Borrow the address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A password that passed [`validate_password`].
#[derive(Clone)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Borrow the password.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ValidatedPassword(<redacted>)")
    }
}

/// Check an address against `local@domain.tld`: exactly one `@`, no
/// whitespace, and a dot inside the domain with text on both sides.
pub fn validate_email(email: &str) -> Result<ValidatedEmail, AppError> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .char_indices()
                    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
        }
        None => false,
    };

    if well_formed {
        Ok(ValidatedEmail(email.to_string()))
    } else {
        Err(AppError::validation(INVALID_EMAIL))
    }
}

/// Check a password: at least ten characters and at least one ASCII letter.
pub fn validate_password(password: &str) -> Result<ValidatedPassword, AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(PASSWORD_TOO_SHORT));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::validation(PASSWORD_NEEDS_LETTER));
    }
    Ok(ValidatedPassword(password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_rules() {
        for ok in ["ada@example.com", "a.b+c@mail.example.org", "x@y.z"] {
            assert!(validate_email(ok).is_ok(), "{ok} should pass");
        }
        for bad in [
            "",
            "ada",
            "ada@",
            "@example.com",
            "ada@example",
            "ada@.com",
            "ada@example.",
            "a da@example.com",
            "ada@@example.com",
            "ada@exa@mple.com",
        ] {
            let err = validate_email(bad).unwrap_err();
            assert_eq!(err.message, INVALID_EMAIL, "{bad:?} should fail");
        }
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(validate_password("short1").unwrap_err().message, PASSWORD_TOO_SHORT);
        assert_eq!(
            validate_password("1234567890").unwrap_err().message,
            PASSWORD_NEEDS_LETTER
        );
        assert_eq!(validate_password("abcdefghij").unwrap().expose(), "abcdefghij");
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = validate_password("supersecret99").unwrap();
        assert!(!format!("{password:?}").contains("supersecret"));
    }
}
