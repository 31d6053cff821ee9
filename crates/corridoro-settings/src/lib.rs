//! CorridorO Settings Crate
//!
//! Persistent configuration for corridor synthesis, printing, import and the
//! initial map view.

pub mod config;
pub mod error;

pub use config::{
    Config, CorridorSettings, ImportSettings, PrintSettings, ViewSettings, APP_DIR, CONFIG_FILE,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
