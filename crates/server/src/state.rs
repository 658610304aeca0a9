use dropconvert_core::{Config, ConversionOrchestrator};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: ConversionOrchestrator,
}

impl AppState {
    pub fn new(config: Config, orchestrator: ConversionOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &ConversionOrchestrator {
        &self.orchestrator
    }
}
