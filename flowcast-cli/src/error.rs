//! CLI error type.

use std::fmt;

use flowcast::app::AppError;
use flowcast::config::ConfigError;
use flowcast::logging::LoggingError;
use flowcast::routing::RouteError;

/// Errors reported by `flowcast` commands. Every variant exits with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Bad or missing configuration.
    Config(String),

    /// Configuration file could not be read or written.
    ConfigFile(ConfigError),

    /// Logging could not be initialized.
    Logging(LoggingError),

    /// Failed to create the Tokio runtime.
    Runtime(std::io::Error),

    /// Application startup or a request failed.
    App(AppError),

    /// Routing ended without usable routes.
    Route(RouteError),

    /// Nothing arrived before the deadline.
    Timeout(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to create Tokio runtime: {}", e),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Route(e) => write!(f, "{}", e),
            CliError::Timeout(what) => write!(f, "Timed out waiting for {}", what),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::App(e) => Some(e),
            CliError::Route(e) => Some(e),
            CliError::Config(_) | CliError::Timeout(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<RouteError> for CliError {
    fn from(e: RouteError) -> Self {
        CliError::Route(e)
    }
}
