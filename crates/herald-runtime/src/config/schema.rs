//! Configuration schema definitions.
//!
//! ```toml
//! debug = false
//! main_guild = "967427683506077764"
//!
//! [commands.ping]
//!
//! [commands.info]
//! enabled = true
//! info_embeds = { rules = { title = "Rules", description = "Be nice." } }
//!
//! [logging]
//! level = "info"
//! format = "compact"
//!
//! [dispatch]
//! autocomplete_requires_enabled = false
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use herald_core::{CommandConfig, CommandConfigs};
use herald_framework::DispatchPolicy;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HeraldConfig {
    /// Raises every `herald_*` log target to `debug`.
    #[serde(default)]
    pub debug: bool,

    /// Guild that commands are published to. `None` publishes globally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_guild: Option<String>,

    /// Per-command configuration. A command without an entry never runs.
    #[serde(default)]
    pub commands: HashMap<String, CommandConfig>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch pipeline switches.
    #[serde(default)]
    pub dispatch: DispatchPolicy,
}

impl HeraldConfig {
    /// Returns a copy of the per-command configuration.
    pub fn command_configs(&self) -> CommandConfigs {
        self.commands.clone()
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,

    /// Log file, required when `output = "file"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    pub rotation: LogRotation,

    /// Per-target level overrides, e.g. `{ herald_framework = "trace" }`.
    pub filters: HashMap<String, LogLevel>,

    pub span_events: SpanEventConfig,
    pub thread_ids: bool,

    /// Include file and line number of each event.
    pub file_location: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_from_empty_document() {
        let config: HeraldConfig = serde_json::from_value(json!({})).unwrap();
        assert!(!config.debug);
        assert!(config.main_guild.is_none());
        assert!(config.commands.is_empty());
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(!config.dispatch.autocomplete_requires_enabled);
    }

    #[test]
    fn command_options_pass_through() {
        let config: HeraldConfig = serde_json::from_value(json!({
            "commands": {
                "ping": {},
                "info": { "enabled": false, "info_embeds": { "rules": { "title": "Rules" } } }
            }
        }))
        .unwrap();

        let configs = config.command_configs();
        assert!(configs["ping"].is_enabled());
        assert!(!configs["info"].is_enabled());
        assert!(configs["info"].get("info_embeds").is_some());
    }

    #[test]
    fn logging_enums_are_lowercase() {
        let logging: LoggingConfig = serde_json::from_value(json!({
            "level": "debug",
            "format": "pretty",
            "output": "file",
            "file_path": "logs/herald.log",
            "rotation": "daily",
            "filters": { "herald_core": "trace" }
        }))
        .unwrap();

        assert_eq!(logging.level.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(logging.format, LogFormat::Pretty);
        assert_eq!(logging.output, LogOutput::File);
        assert_eq!(logging.rotation, LogRotation::Daily);
        assert_eq!(logging.filters["herald_core"], LogLevel::Trace);
    }
}
