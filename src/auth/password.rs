use bcrypt::{hash, verify, DEFAULT_COST};
use rand::Rng;
use thiserror::Error;

use crate::error::FieldErrors;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordError {
    #[error("This password is too short. It must contain at least {0} characters.")]
    TooShort(usize),
    #[error("This password is too long. It must contain at most {0} characters.")]
    TooLong(usize),
    #[error("This password is entirely numeric.")]
    EntirelyNumeric,
    #[error("This password is too common.")]
    TooCommon,
    #[error("Failed to hash password")]
    HashingFailed,
    #[error("Failed to verify password")]
    VerificationFailed,
}

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "football", "baseball",
    "welcome1", "letmein1", "admin123", "abc12345", "11111111", "00000000",
    "trustno1", "superman", "princess", "starwars", "passw0rd", "changeme",
];

/// Password requirements checked at registration and on every password change.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_entirely_numeric: bool,
    pub reject_common: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            allow_entirely_numeric: false,
            reject_common: true,
        }
    }
}

/// Every rule the password breaks, in policy order.
pub fn password_violations(password: &str, policy: &PasswordPolicy) -> Vec<PasswordError> {
    let mut violations = Vec::new();
    let length = password.chars().count();

    if length < policy.min_length {
        violations.push(PasswordError::TooShort(policy.min_length));
    }
    if length > policy.max_length {
        violations.push(PasswordError::TooLong(policy.max_length));
    }
    if policy.reject_common && COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        violations.push(PasswordError::TooCommon);
    }
    if !policy.allow_entirely_numeric && !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        violations.push(PasswordError::EntirelyNumeric);
    }

    violations
}

/// Policy violations as field errors under `field`.
pub fn validate_password_strength(field: &str, password: &str, policy: &PasswordPolicy) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    for violation in password_violations(password, policy) {
        errors.add(field, violation.to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash(password, DEFAULT_COST).map_err(|_| PasswordError::HashingFailed)
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    verify(password, hash).map_err(|_| PasswordError::VerificationFailed)
}

/// Five random digits, leading zeros kept.
pub fn generate_confirmation_code() -> String {
    let mut rng = rand::thread_rng();
    (0..5).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_policy() {
        let policy = PasswordPolicy::default();

        assert_eq!(password_violations("short1", &policy), vec![PasswordError::TooShort(8)]);
        assert!(password_violations("84736251", &policy).contains(&PasswordError::EntirelyNumeric));
        assert!(password_violations("Password123", &policy).contains(&PasswordError::TooCommon));
        assert!(password_violations(&"x".repeat(129), &policy).contains(&PasswordError::TooLong(128)));
        assert!(password_violations("deadlift-day-42", &policy).is_empty());
    }

    #[test]
    fn test_violations_become_field_errors() {
        let errors = validate_password_strength("password", "123", &PasswordPolicy::default()).unwrap_err();
        assert_eq!(errors.get("password").map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_password_hashing() {
        let password = "deadlift-day-42";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("WrongPassword", &hash).unwrap());
    }

    #[test]
    fn test_confirmation_code_generation() {
        for _ in 0..50 {
            let code = generate_confirmation_code();
            assert_eq!(code.len(), 5);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
