//! CLI command implementations

pub mod behavior;
pub mod metrics;
pub mod services;

use crate::output::OutputFormat;
use console_lib::{
    ConsoleConfig, ControlPlane, PollScheduler, RegistryStore, SchedulerConfig, StructuredLogger,
};
use std::sync::Arc;

/// Shared state handed to every command
pub struct CommandContext {
    pub client: Arc<dyn ControlPlane>,
    pub config: ConsoleConfig,
    pub logger: StructuredLogger,
    pub format: OutputFormat,
}

impl CommandContext {
    pub fn new(
        client: Arc<dyn ControlPlane>,
        config: ConsoleConfig,
        logger: StructuredLogger,
        format: OutputFormat,
    ) -> Self {
        Self {
            client,
            config,
            logger,
            format,
        }
    }

    pub fn store(&self) -> RegistryStore {
        RegistryStore::new(self.client.clone(), self.logger.clone())
    }

    pub fn scheduler(&self) -> PollScheduler {
        PollScheduler::new(
            self.client.clone(),
            SchedulerConfig::from_console(&self.config),
            self.logger.clone(),
        )
    }

    /// Historical window to use when none was given
    pub fn minutes(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.config.default_minutes)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
