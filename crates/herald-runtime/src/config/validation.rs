//! Configuration validation utilities.

use herald_core::check_name;

use super::error::{ConfigError, ConfigResult};
use super::schema::{HeraldConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HeraldConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;

    if let Some(guild) = &config.main_guild
        && guild.trim().is_empty()
    {
        return Err(ConfigError::validation("main_guild cannot be empty"));
    }

    for name in config.commands.keys() {
        validate_command_name(name)?;
    }

    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        match &logging.file_path {
            None => {
                return Err(ConfigError::validation(
                    "logging.file_path is required when logging.output is 'file'",
                ));
            }
            Some(path) if path.file_name().is_none() => {
                return Err(ConfigError::validation(format!(
                    "logging.file_path must name a file: {}",
                    path.display()
                )));
            }
            Some(_) => {}
        }
    }

    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: '{target}'"
            )));
        }
    }

    Ok(())
}

/// Validates a command name with the same rule the registry applies, so
/// every configurable name is also registrable.
pub fn validate_command_name(name: &str) -> ConfigResult<()> {
    check_name(name).map_err(|reason| ConfigError::invalid_command_name(name, reason))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use herald_core::CommandConfig;

    #[test]
    fn test_validate_empty_config() {
        let config = HeraldConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_command_names() {
        assert!(validate_command_name("ping").is_ok());
        assert!(validate_command_name("generate-lcc-lore").is_ok());
        assert!(validate_command_name("").is_err());
        assert!(validate_command_name("Ping").is_err());
        assert!(validate_command_name("two words").is_err());
        assert!(validate_command_name(&"x".repeat(33)).is_err());

        let mut config = HeraldConfig::default();
        config
            .commands
            .insert("Bad Name".to_string(), CommandConfig::new());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidCommandName { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_requires_path() {
        let mut config = HeraldConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("logs/herald.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_blank_guild() {
        let config = HeraldConfig {
            main_guild: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
