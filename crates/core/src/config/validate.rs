use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Event capacity is not 0
/// - Background colour parses as `#rgb` or `#rrggbb`
/// - Output directory is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.orchestrator.event_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.event_capacity cannot be 0".to_string(),
        ));
    }

    if config.converter.background_rgb().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "converter.background is not a hex colour: {:?}",
            config.converter.background
        )));
    }

    if config.output.directory.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "output.directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}
