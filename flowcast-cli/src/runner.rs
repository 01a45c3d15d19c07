//! Shared setup for commands that run the navigation core.

use std::future::Future;
use std::sync::Arc;

use flowcast::app::connect_provider;
use flowcast::config::ConfigFile;
use flowcast::logging::{init_logging, LogGuard, LoggingConfig};
use flowcast::provider::DirectionsProvider;
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Loaded configuration, installed logging and a Tokio runtime.
pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    _log_guard: LogGuard,
}

impl CliRunner {
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let log_guard = init_logging(&LoggingConfig::from(&config.logging))?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            config,
            runtime,
            _log_guard: log_guard,
        })
    }

    pub fn log_startup(&self, command: &str) {
        info!(version = flowcast::VERSION, command, "Flowcast starting");
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Directions provider from the `[provider]` section.
    pub fn provider(&self) -> Result<Arc<dyn DirectionsProvider>, CliError> {
        Ok(connect_provider(&self.config.provider)?)
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
