//! Persisted settings

use serde::{Deserialize, Serialize};

/// Server used when none is configured
pub const DEFAULT_SERVER_URL: &str = "bitwarden.com";

/// User preferences that outlive the process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Vault server the CLI talks to
    pub server_url: String,
    /// Whether crash reports may be sent
    #[serde(rename = "crash_logs")]
    pub crash_logs_enabled: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            crash_logs_enabled: false,
        }
    }
}
