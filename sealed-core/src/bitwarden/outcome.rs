//! Classification of failed `bw` invocations
//!
//! The CLI reports failures as free-form text with a non-zero exit code.
//! These helpers turn that text into the matching [`VaultError`] kind.

use crate::error::{VaultError, summarize_output};
use crate::process::ProcessOutput;

const NOT_LOGGED_IN: &[&str] = &[
    "you are not logged in",
    "not logged in",
    "vault is locked",
    "session key is invalid",
];

const NETWORK: &[&str] = &[
    "econnrefused",
    "econnreset",
    "enotfound",
    "etimedout",
    "eai_again",
    "getaddrinfo",
    "fetch failed",
    "socket hang up",
    "network error",
    "failed to fetch",
    "unable to connect",
];

const TWO_FACTOR: &[&str] = &[
    "no provider selected",
    "two-step login code is required",
    "two-step token is required",
    "code is required",
];

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

fn lowered(output: &ProcessOutput) -> String {
    output.failure_text().to_lowercase()
}

/// Returns true if the CLI says the session is missing or expired
#[must_use]
pub fn is_not_logged_in(output: &ProcessOutput) -> bool {
    contains_any(&lowered(output), NOT_LOGGED_IN)
}

/// Returns true if the CLI failed to reach the server
#[must_use]
pub fn is_network_failure(output: &ProcessOutput) -> bool {
    contains_any(&lowered(output), NETWORK)
}

/// Returns true if the CLI could not find the requested object
#[must_use]
pub fn is_not_found(output: &ProcessOutput) -> bool {
    lowered(output).starts_with("not found")
}

/// Returns true if `bw login` refused because an account is already logged in
#[must_use]
pub fn is_already_logged_in(output: &ProcessOutput) -> bool {
    lowered(output).contains("you are already logged in")
}

/// Maps a failed login or unlock to an authentication error
#[must_use]
pub fn auth_failure(output: &ProcessOutput) -> VaultError {
    let text = lowered(output);
    if contains_any(&text, TWO_FACTOR) {
        VaultError::TwoFactorRequired
    } else if contains_any(&text, NETWORK) {
        VaultError::Network(summarize_output(output.failure_text()))
    } else {
        VaultError::Authentication {
            reason: summarize_output(output.failure_text()),
        }
    }
}

/// Maps a failed vault operation
///
/// Session and transport failures are recognised first; anything else is
/// turned into an error by `fallback`, which receives a short reason.
#[must_use]
pub fn remote_failure(
    output: &ProcessOutput,
    fallback: impl FnOnce(String) -> VaultError,
) -> VaultError {
    if is_not_logged_in(output) {
        VaultError::NotAuthenticated
    } else if is_network_failure(output) {
        VaultError::Network(summarize_output(output.failure_text()))
    } else {
        fallback(summarize_output(output.failure_text()))
    }
}
