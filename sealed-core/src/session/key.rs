//! Session key material

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{VaultError, VaultResult};

/// Secret returned by the vault CLI after a successful unlock
///
/// The key is zeroed when dropped and prints as `[REDACTED]`. It can only be
/// read inside this crate, when it is handed to the CLI.
#[derive(Clone)]
pub struct SessionKey(SecretString);

impl SessionKey {
    /// Wraps the raw output of `bw unlock --raw` / `bw login --raw`
    ///
    /// # Errors
    /// Returns `VaultError::Parse` if the output holds no key.
    pub fn from_cli_output(output: &str) -> VaultResult<Self> {
        let key = output.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(VaultError::Parse(
                "vault CLI did not return a session key".to_string(),
            ));
        }
        Ok(Self(SecretString::from(key)))
    }

    pub(crate) const fn secret(&self) -> &SecretString {
        &self.0
    }

    pub(crate) fn matches(&self, other: &str) -> bool {
        self.0.expose_secret() == other
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}
