//! Persistent configuration.
//!
//! [`ConfigFile`] maps an INI file onto typed settings for each component.
//! [`ConfigKey`] addresses individual values as `section.key` for the
//! `flowcast config` commands.

mod file;

pub use file::{
    config_file_path, ConfigError, ConfigFile, ConfigKey, LoggingSettings, ProviderSettings,
    RoutingSettings, TrafficSettings, DEFAULT_LOG_LEVEL,
};
