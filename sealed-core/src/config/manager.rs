//! Loading and saving the configuration file

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::settings::Configuration;
use crate::error::{VaultError, VaultResult};

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

const APP_DIR_NAME: &str = "sealed";

/// Reads and writes `config.toml`
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for the user's configuration directory
    ///
    /// # Errors
    /// Returns `VaultError::Config` if the platform has no configuration
    /// directory.
    pub fn new() -> VaultResult<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            VaultError::Config("could not determine the configuration directory".to_string())
        })?;
        Ok(Self::with_config_dir(base.join(APP_DIR_NAME)))
    }

    /// Creates a manager for a custom directory
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Returns the configuration directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the path of the configuration file
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Loads the configuration; a missing file yields the defaults
    ///
    /// # Errors
    /// Returns `VaultError::Config` if the file cannot be read or parsed.
    pub fn load(&self) -> VaultResult<Configuration> {
        let path = self.config_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                return Ok(Configuration::default());
            }
            Err(e) => {
                return Err(VaultError::Config(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        toml::from_str(&text)
            .map_err(|e| VaultError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Saves the configuration
    ///
    /// The file is written next to its destination and renamed over it, so
    /// a crash never leaves a truncated file behind.
    ///
    /// # Errors
    /// Returns `VaultError::Config` if the file cannot be written.
    pub fn save(&self, config: &Configuration) -> VaultResult<()> {
        let io_err =
            |e: std::io::Error| VaultError::Config(format!("failed to write configuration: {e}"));

        fs::create_dir_all(&self.config_dir).map_err(io_err)?;
        let text = toml::to_string_pretty(config)
            .map_err(|e| VaultError::Config(format!("failed to serialize configuration: {e}")))?;

        let path = self.config_path();
        let tmp = self.config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));
        {
            let mut file = fs::File::create(&tmp).map_err(io_err)?;
            file.write_all(text.as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp, &path).map_err(io_err)?;
        debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}
