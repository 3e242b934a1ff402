//! Password generation policy
//!
//! Passwords are produced by the vault CLI's `generate` command; this module
//! only describes and validates the policy passed to it.

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Shortest password the CLI will generate
pub const MIN_LENGTH: u8 = 5;

/// Longest password the CLI will generate
pub const MAX_LENGTH: u8 = 128;

/// Character classes and length of a generated password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Password length
    pub length: u8,
    /// Include A-Z
    pub uppercase: bool,
    /// Include a-z
    pub lowercase: bool,
    /// Include 0-9
    pub numbers: bool,
    /// Include punctuation
    pub special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: 16,
            uppercase: true,
            lowercase: true,
            numbers: true,
            special: false,
        }
    }
}

impl PasswordPolicy {
    /// Sets the length
    #[must_use]
    pub const fn with_length(mut self, length: u8) -> Self {
        self.length = length;
        self
    }

    /// Enables or disables punctuation
    #[must_use]
    pub const fn with_special(mut self, special: bool) -> Self {
        self.special = special;
        self
    }

    /// Enables or disables digits
    #[must_use]
    pub const fn with_numbers(mut self, numbers: bool) -> Self {
        self.numbers = numbers;
        self
    }

    /// Enables or disables upper and lower case letters
    #[must_use]
    pub const fn with_letters(mut self, uppercase: bool, lowercase: bool) -> Self {
        self.uppercase = uppercase;
        self.lowercase = lowercase;
        self
    }

    /// Checks the policy can produce a password
    ///
    /// # Errors
    /// Returns `VaultError::Validation` if the length is out of range or no
    /// character class is enabled.
    pub fn validate(&self) -> VaultResult<()> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.length) {
            return Err(VaultError::Validation(format!(
                "Password length must be between {MIN_LENGTH} and {MAX_LENGTH}"
            )));
        }
        if !(self.uppercase || self.lowercase || self.numbers || self.special) {
            return Err(VaultError::Validation(
                "At least one character class is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Arguments for `bw generate`
    #[must_use]
    pub fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["generate".to_string()];
        for (enabled, flag) in [
            (self.uppercase, "-u"),
            (self.lowercase, "-l"),
            (self.numbers, "-n"),
            (self.special, "-s"),
        ] {
            if enabled {
                args.push(flag.to_string());
            }
        }
        args.push("--length".to_string());
        args.push(self.length.to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PasswordPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(
            policy.to_cli_args(),
            vec!["generate", "-u", "-l", "-n", "--length", "16"]
        );
    }

    #[test]
    fn test_special_characters_flag() {
        let args = PasswordPolicy::default()
            .with_special(true)
            .with_length(32)
            .to_cli_args();
        assert!(args.contains(&"-s".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("32"));
    }

    #[test]
    fn test_length_bounds() {
        assert!(PasswordPolicy::default().with_length(4).validate().is_err());
        assert!(PasswordPolicy::default().with_length(5).validate().is_ok());
        assert!(PasswordPolicy::default().with_length(128).validate().is_ok());
        assert!(PasswordPolicy::default().with_length(129).validate().is_err());
    }

    #[test]
    fn test_requires_character_class() {
        let policy = PasswordPolicy::default()
            .with_letters(false, false)
            .with_numbers(false);
        assert!(matches!(policy.validate(), Err(VaultError::Validation(_))));
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: PasswordPolicy = serde_json::from_str(r#"{"length": 24}"#).unwrap();
        assert_eq!(policy.length, 24);
        assert!(policy.uppercase);
        assert!(!policy.special);
    }
}
