use bcrypt::{hash, verify, DEFAULT_COST};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::PasswordPolicy;
use crate::errors::{AppError, Result};

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*";

const TEMPORARY_PASSWORD_LENGTH: usize = 12;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to verify password: {e}")))
    }

    /// Check a candidate password against the configured policy. Violations
    /// come back as the field-level detail list of a WEAK_PASSWORD error.
    pub fn validate_policy(password: &str, policy: &PasswordPolicy) -> Result<()> {
        let mut errors = Vec::new();

        if password.chars().count() < policy.min_length {
            errors.push(format!(
                "Password must be at least {} characters long",
                policy.min_length
            ));
        }
        if password.chars().count() > policy.max_length {
            errors.push(format!(
                "Password must not exceed {} characters",
                policy.max_length
            ));
        }
        if policy.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push("Password must contain at least one uppercase letter".to_string());
        }
        if policy.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push("Password must contain at least one lowercase letter".to_string());
        }
        if policy.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Password must contain at least one number".to_string());
        }
        if policy.require_special_char
            && !password
                .chars()
                .any(|c| "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?".contains(c))
        {
            errors.push("Password must contain at least one special character".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::WeakPassword(errors))
        }
    }

    /// Generate a random temporary password that always satisfies the policy:
    /// one character from each required class up front, random fill to
    /// length, then a shuffle so class positions are not predictable.
    pub fn generate_temporary(policy: &PasswordPolicy) -> String {
        let mut rng = rand::thread_rng();
        let length = TEMPORARY_PASSWORD_LENGTH.max(policy.min_length);

        let mut chars: Vec<u8> = Vec::with_capacity(length);
        let mut pool: Vec<u8> = Vec::new();

        for (required, class) in [
            (policy.require_uppercase, UPPERCASE),
            (policy.require_lowercase, LOWERCASE),
            (policy.require_number, DIGITS),
            (policy.require_special_char, SPECIAL),
        ] {
            pool.extend_from_slice(class);
            if required {
                chars.push(class[rng.gen_range(0..class.len())]);
            }
        }

        while chars.len() < length {
            chars.push(pool[rng.gen_range(0..pool.len())]);
        }

        chars.shuffle(&mut rng);
        String::from_utf8(chars).expect("password characters are ASCII")
    }
}
