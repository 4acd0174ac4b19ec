//! File-backed configuration source.

use herald_core::{CommandConfigs, ConfigSource, ConfigSourceError};
use parking_lot::RwLock;
use tracing::debug;

use super::error::ConfigResult;
use super::loader::ConfigLoader;
use super::schema::HeraldConfig;
use super::validation::validate_config;

/// A [`ConfigSource`] that re-runs a [`ConfigLoader`] on every reload.
///
/// The whole document is re-read and validated; a document that fails
/// either step leaves the held configuration untouched.
#[derive(Debug)]
pub struct FileConfigSource {
    loader: ConfigLoader,
    current: RwLock<HeraldConfig>,
}

impl FileConfigSource {
    /// Runs the loader once and keeps the result.
    pub fn load(loader: ConfigLoader) -> ConfigResult<Self> {
        let config = Self::read(&loader)?;
        Ok(Self {
            loader,
            current: RwLock::new(config),
        })
    }

    fn read(loader: &ConfigLoader) -> ConfigResult<HeraldConfig> {
        let config = loader.clone().load()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Returns a copy of the whole held configuration.
    pub fn config(&self) -> HeraldConfig {
        self.current.read().clone()
    }

    /// Re-reads the whole document, replacing the held copy on success.
    pub fn reload_full(&self) -> ConfigResult<HeraldConfig> {
        debug!("Reloading config...");
        let config = Self::read(&self.loader)?;
        *self.current.write() = config.clone();
        debug!("Config transferred from file to memory.");
        Ok(config)
    }
}

impl ConfigSource for FileConfigSource {
    fn current_config(&self) -> CommandConfigs {
        self.current.read().command_configs()
    }

    fn reload(&self) -> Result<CommandConfigs, ConfigSourceError> {
        self.reload_full()
            .map(|config| config.command_configs())
            .map_err(ConfigSourceError::new)
    }
}

#[cfg(all(test, feature = "toml-config"))]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn reload_picks_up_changes_and_keeps_old_on_error() {
        Jail::expect_with(|jail| {
            jail.create_file("herald.toml", "[commands.ping]\n")?;
            let source = FileConfigSource::load(
                ConfigLoader::new()
                    .search_path(jail.directory())
                    .without_env(),
            )
            .map_err(|e| e.to_string())?;
            assert_eq!(source.current_config().len(), 1);

            jail.create_file("herald.toml", "[commands.ping]\n[commands.info]\nenabled = false\n")?;
            let reloaded = source.reload().map_err(|e| e.to_string())?;
            assert_eq!(reloaded.len(), 2);
            assert!(!reloaded["info"].is_enabled());

            jail.create_file("herald.toml", "[commands.\"Not Valid\"]\n")?;
            assert!(source.reload().is_err());
            assert_eq!(source.current_config().len(), 2);
            Ok(())
        });
    }
}
