//! Persisted user preferences
//!
//! [`ConfigManager`] loads and saves [`Configuration`] as a TOML file.

mod manager;
mod settings;

pub use manager::{CONFIG_FILE_NAME, ConfigManager};
pub use settings::{Configuration, DEFAULT_SERVER_URL};
