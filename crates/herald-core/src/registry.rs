//! Command registry.
//!
//! Holds the set of declared commands, keyed by unique name, in registration
//! order. Lookups run on every dispatch and take a shared lock; registration
//! and full replacement take the exclusive lock once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::command::{Command, CommandManifest, check_name};
use crate::error::{RegistryError, RegistryResult};

#[derive(Default)]
struct Inner {
    ordered: Vec<Arc<Command>>,
    by_name: HashMap<String, Arc<Command>>,
}

impl Inner {
    fn build(commands: Vec<Command>) -> RegistryResult<Self> {
        let mut inner = Self::default();
        for command in commands {
            inner.push(command)?;
        }
        Ok(inner)
    }

    fn push(&mut self, command: Command) -> RegistryResult<()> {
        if let Err(reason) = check_name(command.name()) {
            return Err(RegistryError::InvalidName {
                name: command.name().to_string(),
                reason,
            });
        }
        if self.by_name.contains_key(command.name()) {
            return Err(RegistryError::DuplicateCommand {
                name: command.name().to_string(),
            });
        }
        let command = Arc::new(command);
        self.by_name
            .insert(command.name().to_string(), Arc::clone(&command));
        self.ordered.push(command);
        Ok(())
    }
}

/// Name-indexed set of commands.
#[derive(Default)]
pub struct CommandRegistry {
    inner: RwLock<Inner>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command. Fails if the name is already taken.
    pub fn register_command(&self, command: Command) -> RegistryResult<()> {
        let name = command.name().to_string();
        self.inner.write().push(command)?;
        debug!(command = %name, "Registered command");
        Ok(())
    }

    /// Looks up a command by exact name.
    pub fn find_command(&self, name: &str) -> Option<Arc<Command>> {
        self.inner.read().by_name.get(name).cloned()
    }

    /// All commands in registration order.
    pub fn list_commands(&self) -> Vec<Arc<Command>> {
        self.inner.read().ordered.clone()
    }

    /// Declarations of all commands in registration order.
    pub fn manifests(&self) -> Vec<CommandManifest> {
        self.inner
            .read()
            .ordered
            .iter()
            .map(|c| c.manifest())
            .collect()
    }

    /// Replaces the whole command set.
    ///
    /// The new set is validated before anything is swapped, so a duplicate
    /// leaves the registry exactly as it was.
    pub fn replace_all(&self, commands: Vec<Command>) -> RegistryResult<usize> {
        let fresh = Inner::build(commands)?;
        let count = fresh.ordered.len();
        *self.inner.write() = fresh;
        info!(commands = count, "Command set replaced");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.inner.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().ordered.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .inner
            .read()
            .ordered
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        f.debug_struct("CommandRegistry")
            .field("commands", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandContext;

    async fn noop(_ctx: CommandContext) {}

    fn names(registry: &CommandRegistry) -> Vec<String> {
        registry
            .list_commands()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    #[test]
    fn register_and_find() {
        let registry = CommandRegistry::new();
        registry.register_command(Command::new("ping", noop)).unwrap();
        registry.register_command(Command::new("info", noop)).unwrap();

        assert_eq!(registry.find_command("ping").unwrap().name(), "ping");
        assert!(registry.find_command("Ping").is_none());
        assert_eq!(names(&registry), vec!["ping", "info"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = CommandRegistry::new();
        registry.register_command(Command::new("ping", noop)).unwrap();
        let err = registry
            .register_command(Command::new("ping", noop))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateCommand {
                name: "ping".into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn names_follow_platform_rules() {
        let registry = CommandRegistry::new();
        let err = registry
            .register_command(Command::new("Ping", noop))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName { ref name, .. } if name == "Ping"));

        registry.register_command(Command::new("ping", noop)).unwrap();
        assert!(
            registry
                .replace_all(vec![Command::new("info", noop), Command::new("two words", noop)])
                .is_err()
        );
        assert_eq!(names(&registry), vec!["ping"]);
    }

    #[test]
    fn replace_all_is_atomic() {
        let registry = CommandRegistry::new();
        registry.register_command(Command::new("ping", noop)).unwrap();

        let err = registry.replace_all(vec![
            Command::new("info", noop),
            Command::new("info", noop),
        ]);
        assert!(err.is_err());
        assert_eq!(names(&registry), vec!["ping"]);

        let count = registry
            .replace_all(vec![Command::new("info", noop), Command::new("reload", noop)])
            .unwrap();
        assert_eq!(count, 2);
        assert!(registry.find_command("ping").is_none());
        assert_eq!(names(&registry), vec!["info", "reload"]);
    }

    #[test]
    fn held_command_survives_replacement() {
        let registry = CommandRegistry::new();
        registry.register_command(Command::new("ping", noop)).unwrap();
        let held = registry.find_command("ping").unwrap();
        registry.replace_all(Vec::new()).unwrap();
        assert!(registry.is_empty());
        assert_eq!(held.name(), "ping");
    }
}
