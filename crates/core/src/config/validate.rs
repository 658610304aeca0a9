use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0 and uploads are allowed
/// - Engine location and event capacity are set
/// - Default output format is a plain format name
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }
    if config.server.max_upload_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_upload_bytes cannot be 0".to_string(),
        ));
    }

    // Engine validation
    if config.engine.core_location.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.core_location cannot be empty".to_string(),
        ));
    }
    if config.engine.event_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "engine.event_capacity cannot be 0".to_string(),
        ));
    }

    // Orchestrator validation
    let format = &config.orchestrator.default_output_format;
    if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::ValidationError(format!(
            "orchestrator.default_output_format must be a plain format name, got \"{}\"",
            format
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_validate_empty_core_location_fails() {
        let mut config = Config::default();
        config.engine.core_location = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("engine.core_location"));
    }

    #[test]
    fn test_validate_zero_capacity_fails() {
        let mut config = Config::default();
        config.engine.event_capacity = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_output_format() {
        let mut config = Config::default();
        config.orchestrator.default_output_format = "../mp4".to_string();
        assert!(validate_config(&config).is_err());

        config.orchestrator.default_output_format = String::new();
        assert!(validate_config(&config).is_err());

        config.orchestrator.default_output_format = "mp3".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_upload_limit_fails() {
        let mut config = Config::default();
        config.server.max_upload_bytes = 0;
        assert!(validate_config(&config).is_err());
    }
}
