//! Configuration for the engine module.

use serde::{Deserialize, Serialize};

/// Configuration for the media engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Location of the engine core. For the native engine this is the
    /// ffmpeg executable.
    #[serde(default = "default_core_location")]
    pub core_location: String,

    /// Location of the engine's runtime assets. For the native engine this is
    /// the directory that hosts the virtual filesystem (empty = system temp).
    #[serde(default)]
    pub wasm_location: String,

    /// Engine log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Capacity of the progress/log event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Additional global arguments passed before every argument vector.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_core_location() -> String {
    "ffmpeg".to_string()
}

fn default_log_level() -> String {
    // Progress is derived from info-level status lines
    "info".to_string()
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            core_location: default_core_location(),
            wasm_location: String::new(),
            log_level: default_log_level(),
            event_capacity: default_event_capacity(),
            extra_args: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Creates a new config with custom resource locations.
    pub fn with_locations(core_location: impl Into<String>, wasm_location: impl Into<String>) -> Self {
        Self {
            core_location: core_location.into(),
            wasm_location: wasm_location.into(),
            ..Default::default()
        }
    }

    /// Sets the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.core_location, "ffmpeg");
        assert!(config.wasm_location.is_empty());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::with_locations("/opt/ffmpeg/bin/ffmpeg", "/var/tmp/engine")
            .with_event_capacity(64);

        assert_eq!(config.core_location, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.wasm_location, "/var/tmp/engine");
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            core_location = "/usr/bin/ffmpeg"
            extra_args = ["-threads", "2"]
        "#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.core_location, "/usr/bin/ffmpeg");
        assert_eq!(config.extra_args, vec!["-threads", "2"]);
        assert_eq!(config.event_capacity, 1024);
    }
}
