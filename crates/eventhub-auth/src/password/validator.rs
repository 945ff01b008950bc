//! Password policy enforcement for new passwords.

use eventhub_core::config::AuthConfig;
use eventhub_core::error::AppError;

/// Longest password accepted, in bytes. Bounds hashing cost.
const MAX_PASSWORD_BYTES: usize = 128;

/// Validates new passwords against the configured length policy.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    /// Minimum password length in characters.
    min_length: usize,
}

impl PasswordValidator {
    /// Creates a new validator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            min_length: config.password_min_length,
        }
    }

    /// Returns `Ok(())` if the password meets the policy.
    pub fn validate(&self, password: &str) -> Result<(), AppError> {
        if password.chars().count() < self.min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::validation(format!(
                "Password must be at most {MAX_PASSWORD_BYTES} bytes long"
            )));
        }
        if password.trim().is_empty() {
            return Err(AppError::validation("Password cannot be blank"));
        }
        Ok(())
    }
}
