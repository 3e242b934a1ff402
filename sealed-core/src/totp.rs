//! Time-based one-time codes (RFC 6238)
//!
//! Codes are computed locally from the shared secret; no session or CLI call
//! is involved. Secrets are accepted as base32 text (whitespace, lower case
//! and `=` padding tolerated) or as `otpauth://totp/...` URIs that may also
//! set `digits`, `period` and `algorithm`.

use std::fmt;

use data_encoding::BASE32_NOPAD;
use ring::hmac;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

const DEFAULT_DIGITS: u32 = 6;
const DEFAULT_PERIOD: u64 = 30;
const OTPAUTH_PREFIX: &str = "otpauth://";

/// HMAC function used for the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TotpAlgorithm {
    /// HMAC-SHA1, the default
    #[default]
    Sha1,
    /// HMAC-SHA256
    Sha256,
    /// HMAC-SHA512
    Sha512,
}

impl TotpAlgorithm {
    fn parse(name: &str) -> VaultResult<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA512" => Ok(Self::Sha512),
            other => Err(VaultError::Totp(format!("unsupported algorithm {other}"))),
        }
    }

    const fn hmac(self) -> hmac::Algorithm {
        match self {
            Self::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => hmac::HMAC_SHA256,
            Self::Sha512 => hmac::HMAC_SHA512,
        }
    }
}

/// Decoded secret and code parameters
pub struct TotpParams {
    key: Zeroizing<Vec<u8>>,
    /// Number of digits in the code (6 to 8)
    pub digits: u32,
    /// Length of a time window in seconds
    pub period: u64,
    /// HMAC function
    pub algorithm: TotpAlgorithm,
}

impl fmt::Debug for TotpParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TotpParams")
            .field("key", &"[REDACTED]")
            .field("digits", &self.digits)
            .field("period", &self.period)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

fn decode_base32(secret: &str) -> VaultResult<Zeroizing<Vec<u8>>> {
    let normalized: Zeroizing<String> = Zeroizing::new(
        secret
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect(),
    );
    let unpadded = normalized.trim_end_matches('=');
    if unpadded.is_empty() {
        return Err(VaultError::Totp("secret is empty".to_string()));
    }
    BASE32_NOPAD
        .decode(unpadded.as_bytes())
        .map(Zeroizing::new)
        .map_err(|_| VaultError::Totp("secret is not valid base32".to_string()))
}

impl TotpParams {
    /// Parses a base32 secret or an `otpauth://` URI
    ///
    /// # Errors
    /// Returns `VaultError::Totp` if the secret or a parameter is malformed.
    pub fn parse(input: &str) -> VaultResult<Self> {
        let input = input.trim();
        if input
            .get(..OTPAUTH_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(OTPAUTH_PREFIX))
        {
            return Self::parse_uri(input);
        }
        Ok(Self {
            key: decode_base32(input)?,
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
            algorithm: TotpAlgorithm::default(),
        })
    }

    fn parse_uri(uri: &str) -> VaultResult<Self> {
        let rest = &uri[OTPAUTH_PREFIX.len()..];
        if !rest.to_ascii_lowercase().starts_with("totp/") {
            return Err(VaultError::Totp("only totp URIs are supported".to_string()));
        }
        let query = rest
            .split_once('?')
            .map(|(_, q)| q)
            .ok_or_else(|| VaultError::Totp("URI has no parameters".to_string()))?;

        let mut key = None;
        let mut digits = DEFAULT_DIGITS;
        let mut period = DEFAULT_PERIOD;
        let mut algorithm = TotpAlgorithm::default();

        for pair in query.split('&') {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            match name.to_ascii_lowercase().as_str() {
                "secret" => key = Some(decode_base32(&value.replace("%3D", "="))?),
                "digits" => {
                    digits = value
                        .parse()
                        .ok()
                        .filter(|d| (6..=8).contains(d))
                        .ok_or_else(|| VaultError::Totp(format!("unsupported digits {value}")))?;
                }
                "period" => {
                    period = value
                        .parse()
                        .ok()
                        .filter(|p| *p > 0)
                        .ok_or_else(|| VaultError::Totp(format!("invalid period {value}")))?;
                }
                "algorithm" => algorithm = TotpAlgorithm::parse(value)?,
                _ => {}
            }
        }

        Ok(Self {
            key: key.ok_or_else(|| VaultError::Totp("URI has no secret".to_string()))?,
            digits,
            period,
            algorithm,
        })
    }

    /// Computes the HOTP value for a counter (RFC 4226)
    #[must_use]
    pub fn hotp(&self, counter: u64) -> String {
        let key = hmac::Key::new(self.algorithm.hmac(), &self.key);
        let tag = hmac::sign(&key, &counter.to_be_bytes());
        let hash = tag.as_ref();

        let offset = usize::from(hash[hash.len() - 1] & 0x0f);
        let binary = ((u32::from(hash[offset]) & 0x7f) << 24)
            | (u32::from(hash[offset + 1]) << 16)
            | (u32::from(hash[offset + 2]) << 8)
            | u32::from(hash[offset + 3]);
        let value = binary % 10u32.pow(self.digits);
        format!("{value:0width$}", width = self.digits as usize)
    }

    /// Computes the code for a Unix time in seconds
    #[must_use]
    pub fn code_at(&self, unix_time: u64) -> TotpCode {
        let counter = unix_time / self.period;
        TotpCode {
            code: self.hotp(counter),
            period: self.period,
            remaining_seconds: self.period - unix_time % self.period,
        }
    }
}

/// A generated code and its validity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotpCode {
    /// The code, zero-padded to the configured digits
    pub code: String,
    /// Window length in seconds
    pub period: u64,
    /// Seconds until the code changes
    pub remaining_seconds: u64,
}

/// Generates the current code for a secret
///
/// # Errors
/// Returns `VaultError::Totp` if the secret is malformed.
pub fn generate_totp(secret: &SecretString) -> VaultResult<TotpCode> {
    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    generate_totp_at(secret, now)
}

/// Generates the code for a secret at a given Unix time
///
/// # Errors
/// Returns `VaultError::Totp` if the secret is malformed.
pub fn generate_totp_at(secret: &SecretString, unix_time: u64) -> VaultResult<TotpCode> {
    Ok(TotpParams::parse(secret.expose_secret())?.code_at(unix_time))
}
