//! Configuration binding between command names and their config records.
//!
//! The configuration itself belongs to an external loader (see
//! [`ConfigSource`]). The engine only ever reads an immutable snapshot held
//! by a [`ConfigBinding`]; a reload swaps the whole snapshot in one step so no
//! reader can observe a half-updated mapping.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::ConfigSourceError;

/// Configuration record for one command.
///
/// Only `enabled` has meaning to the engine. Every other key is passed
/// through to the command handler untouched.
///
/// ```yaml
/// commands:
///   info:
///     enabled: true
///     info_embeds:
///       rules: { title: "Rules", description: "Be nice." }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl CommandConfig {
    /// A config with no options and no explicit `enabled` flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with `enabled` set explicitly.
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            options: Map::new(),
        }
    }

    /// Adds an option.
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// `enabled`, defaulting to `true` when absent.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Returns a raw option value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Deserialises one option into `T`.
    pub fn option<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Deserialises all options into a typed struct.
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.options.clone()))
    }
}

/// Full mapping from command name to config.
pub type CommandConfigs = HashMap<String, CommandConfig>;

type Snapshot = Arc<HashMap<String, Arc<CommandConfig>>>;

/// External configuration loader.
///
/// Implemented by the runtime's file-backed loader; tests use in-memory maps.
pub trait ConfigSource: Send + Sync {
    /// Returns the configuration currently held by the loader.
    fn current_config(&self) -> CommandConfigs;

    /// Re-reads the backing store and returns the fresh configuration.
    fn reload(&self) -> Result<CommandConfigs, ConfigSourceError>;
}

/// Read-side binding from command name to [`CommandConfig`].
#[derive(Debug, Default)]
pub struct ConfigBinding {
    snapshot: RwLock<Snapshot>,
}

impl ConfigBinding {
    /// Creates a binding over the given configuration.
    pub fn new(configs: CommandConfigs) -> Self {
        Self {
            snapshot: RwLock::new(Self::freeze(configs)),
        }
    }

    /// Creates a binding from the loader's current configuration.
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        Self::new(source.current_config())
    }

    fn freeze(configs: CommandConfigs) -> Snapshot {
        Arc::new(
            configs
                .into_iter()
                .map(|(name, cfg)| (name, Arc::new(cfg)))
                .collect(),
        )
    }

    /// Looks up the config for a command. `None` means "never dispatch".
    pub fn resolve(&self, command: &str) -> Option<Arc<CommandConfig>> {
        self.snapshot.read().get(command).cloned()
    }

    /// Returns `config.enabled`, defaulting to `true`.
    pub fn is_enabled(config: &CommandConfig) -> bool {
        config.is_enabled()
    }

    /// Replaces the whole mapping atomically.
    pub fn replace(&self, configs: CommandConfigs) {
        let fresh = Self::freeze(configs);
        *self.snapshot.write() = fresh;
    }

    /// Reloads from `source` and swaps in the result.
    ///
    /// On failure the previous snapshot stays in place.
    pub fn refresh(&self, source: &dyn ConfigSource) -> Result<usize, ConfigSourceError> {
        debug!("Reloading command configuration");
        match source.reload() {
            Ok(configs) => {
                let count = configs.len();
                self.replace(configs);
                debug!(commands = count, "Command configuration swapped in");
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "Configuration reload failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    /// Returns the number of configured commands.
    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Returns `true` when no command is configured.
    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }

    /// Returns the configured command names, sorted.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    struct MemorySource {
        current: Mutex<CommandConfigs>,
        next: Mutex<Option<CommandConfigs>>,
    }

    impl ConfigSource for MemorySource {
        fn current_config(&self) -> CommandConfigs {
            self.current.lock().clone()
        }

        fn reload(&self) -> Result<CommandConfigs, ConfigSourceError> {
            match self.next.lock().take() {
                Some(next) => {
                    *self.current.lock() = next.clone();
                    Ok(next)
                }
                None => Err(ConfigSourceError::new("file vanished")),
            }
        }
    }

    fn configs(entries: &[(&str, CommandConfig)]) -> CommandConfigs {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn enabled_defaults_to_true() {
        assert!(CommandConfig::new().is_enabled());
        assert!(!CommandConfig::with_enabled(false).is_enabled());
        let parsed: CommandConfig = serde_json::from_value(json!({ "colour": "red" })).unwrap();
        assert!(parsed.is_enabled());
        assert_eq!(parsed.option::<String>("colour").as_deref(), Some("red"));
    }

    #[test]
    fn resolve_misses_unconfigured_commands() {
        let binding = ConfigBinding::new(configs(&[("ping", CommandConfig::new())]));
        assert!(binding.resolve("ping").is_some());
        assert!(binding.resolve("pong").is_none());
    }

    #[test]
    fn replace_swaps_whole_snapshot() {
        let binding = ConfigBinding::new(configs(&[
            ("ping", CommandConfig::new()),
            ("info", CommandConfig::new()),
        ]));
        let held = binding.resolve("info").unwrap();

        binding.replace(configs(&[("ping", CommandConfig::with_enabled(false))]));

        assert!(binding.resolve("info").is_none());
        assert!(!binding.resolve("ping").unwrap().is_enabled());
        // Readers holding an old record keep seeing it unchanged.
        assert!(held.is_enabled());
    }

    #[test]
    fn refresh_keeps_snapshot_on_failure() {
        let source = MemorySource {
            current: Mutex::new(configs(&[("ping", CommandConfig::new())])),
            next: Mutex::new(Some(configs(&[
                ("ping", CommandConfig::new()),
                ("info", CommandConfig::new()),
            ]))),
        };
        let binding = ConfigBinding::from_source(&source);
        assert_eq!(binding.len(), 1);

        assert_eq!(binding.refresh(&source).unwrap(), 2);
        assert_eq!(binding.command_names(), vec!["info", "ping"]);

        assert!(binding.refresh(&source).is_err());
        assert_eq!(binding.len(), 2);
    }

    #[test]
    fn parse_typed_options() {
        #[derive(Deserialize)]
        struct InfoOptions {
            info_embeds: HashMap<String, Value>,
        }

        let cfg: CommandConfig = serde_json::from_value(json!({
            "enabled": true,
            "info_embeds": { "rules": { "title": "Rules" } }
        }))
        .unwrap();
        let opts: InfoOptions = cfg.parse().unwrap();
        assert!(opts.info_embeds.contains_key("rules"));
    }
}
