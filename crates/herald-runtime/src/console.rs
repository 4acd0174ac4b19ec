//! Operational console.
//!
//! A line-oriented control surface for the operator running the bot, parsed
//! with `clap`:
//!
//! | Command            | Effect                                        |
//! |--------------------|-----------------------------------------------|
//! | `reload`           | Re-read the configuration file                |
//! | `registercommands` | Rebuild the command set and publish it        |
//! | `appcmdlist`       | List the registered command names             |
//! | `help`             | List console commands                         |
//! | `exit`             | Request runtime shutdown                      |

use std::sync::Arc;

use clap::error::ErrorKind;
use tracing::{info, warn};

use crate::publish::CommandPublisher;
use crate::runtime::HeraldRuntime;

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Reload,
    RegisterCommands,
    AppCmdList,
    Help,
    Exit,
}

impl ConsoleCommand {
    /// Every console command, in `help` order.
    pub const ALL: [ConsoleCommand; 5] = [
        ConsoleCommand::Exit,
        ConsoleCommand::Reload,
        ConsoleCommand::RegisterCommands,
        ConsoleCommand::AppCmdList,
        ConsoleCommand::Help,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Reload => "reload",
            Self::RegisterCommands => "registercommands",
            Self::AppCmdList => "appcmdlist",
            Self::Help => "help",
            Self::Exit => "exit",
        }
    }

    fn about(self) -> &'static str {
        match self {
            Self::Reload => "Reload the configuration file",
            Self::RegisterCommands => "Rebuild and publish application commands",
            Self::AppCmdList => "List registered application commands",
            Self::Help => "List console commands",
            Self::Exit => "Stop the bot",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    fn cli() -> clap::Command {
        Self::ALL.into_iter().fold(
            clap::Command::new("console")
                .no_binary_name(true)
                .disable_help_subcommand(true)
                .disable_help_flag(true)
                .subcommand_required(true),
            |cli, command| {
                cli.subcommand(clap::Command::new(command.name()).about(command.about()))
            },
        )
    }

    /// Parses one console line.
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = words.first() else {
            return Ok(None);
        };

        if Self::from_name(first).is_none() {
            return Err(unknown(first));
        }

        match Self::cli().try_get_matches_from(words.iter().copied()) {
            Ok(matches) => Ok(matches.subcommand_name().and_then(Self::from_name)),
            Err(e) if e.kind() == ErrorKind::InvalidSubcommand => Err(unknown(first)),
            Err(e) => Err(e.to_string().trim_end().to_string()),
        }
    }
}

fn unknown(name: &str) -> String {
    format!("Unknown command \"{name}\". Type \"help\" for a list of commands.")
}

/// What the caller should do after a console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleOutcome {
    /// Print this and keep reading.
    Output(String),
    /// Nothing to print; keep reading.
    Silent,
    /// Stop reading; shutdown was requested.
    Exit,
}

/// Executes console lines against a runtime.
pub struct Console {
    runtime: Arc<HeraldRuntime>,
    publisher: Option<Arc<dyn CommandPublisher>>,
}

impl Console {
    pub fn new(runtime: Arc<HeraldRuntime>) -> Self {
        Self {
            runtime,
            publisher: None,
        }
    }

    /// Sets the publisher used by `registercommands`.
    pub fn with_publisher(mut self, publisher: Arc<dyn CommandPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Parses and runs one line.
    pub async fn execute(&self, line: &str) -> ConsoleOutcome {
        match ConsoleCommand::parse(line) {
            Ok(Some(command)) => self.run(command).await,
            Ok(None) => ConsoleOutcome::Silent,
            Err(message) => ConsoleOutcome::Output(message),
        }
    }

    async fn run(&self, command: ConsoleCommand) -> ConsoleOutcome {
        match command {
            ConsoleCommand::Exit => {
                info!("Exit requested from console");
                self.runtime.shutdown();
                ConsoleOutcome::Exit
            }
            ConsoleCommand::Reload => match self.runtime.reload() {
                Ok(count) => ConsoleOutcome::Output(format!(
                    "Configuration reloaded ({count} command(s) configured)."
                )),
                Err(e) => ConsoleOutcome::Output(e.to_string()),
            },
            ConsoleCommand::RegisterCommands => match &self.publisher {
                Some(publisher) => match self.runtime.register_commands(publisher.as_ref()).await {
                    Ok(_) => ConsoleOutcome::Output(
                        "Successfully registered application commands.".to_string(),
                    ),
                    Err(e) => ConsoleOutcome::Output(e.to_string()),
                },
                None => {
                    warn!("registercommands used without a command publisher");
                    ConsoleOutcome::Output("No command publisher is configured.".to_string())
                }
            },
            ConsoleCommand::AppCmdList => {
                ConsoleOutcome::Output(self.runtime.command_names().join(", "))
            }
            ConsoleCommand::Help => {
                let names: Vec<&str> = ConsoleCommand::ALL.iter().map(|c| c.name()).collect();
                ConsoleOutcome::Output(format!("Available commands: {}", names.join(", ")))
            }
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("publisher", &self.publisher.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeraldConfig;
    use async_trait::async_trait;
    use herald_core::{BoxError, Command, CommandContext, CommandManifest};

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            ConsoleCommand::parse("reload"),
            Ok(Some(ConsoleCommand::Reload))
        );
        assert_eq!(
            ConsoleCommand::parse("  appcmdlist  "),
            Ok(Some(ConsoleCommand::AppCmdList))
        );
        assert_eq!(ConsoleCommand::parse(""), Ok(None));
        assert_eq!(ConsoleCommand::parse("   "), Ok(None));
    }

    #[test]
    fn extra_arguments_are_rejected() {
        assert!(ConsoleCommand::parse("exit now").is_err());
    }

    #[test]
    fn unknown_command_message() {
        assert_eq!(
            ConsoleCommand::parse("restart now"),
            Err("Unknown command \"restart\". Type \"help\" for a list of commands.".to_string())
        );
    }

    struct Refuse;

    #[async_trait]
    impl CommandPublisher for Refuse {
        async fn publish(&self, _: Option<&str>, _: &[CommandManifest]) -> Result<(), BoxError> {
            Err("401 Unauthorized".into())
        }
    }

    fn runtime() -> Arc<HeraldRuntime> {
        let noop = |_ctx: CommandContext| async {};
        Arc::new(
            HeraldRuntime::builder()
                .without_env()
                .without_logging()
                .without_discovery()
                .merge(HeraldConfig::default())
                .command(Command::new("ping", noop))
                .command(Command::new("info", noop))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn lists_help_and_commands() {
        let console = Console::new(runtime());

        assert_eq!(
            console.execute("appcmdlist").await,
            ConsoleOutcome::Output("ping, info, reload".to_string())
        );
        assert_eq!(
            console.execute("help").await,
            ConsoleOutcome::Output(
                "Available commands: exit, reload, registercommands, appcmdlist, help"
                    .to_string()
            )
        );
        assert_eq!(console.execute("").await, ConsoleOutcome::Silent);
    }

    #[tokio::test]
    async fn registercommands_reports_failure() {
        let console = Console::new(runtime());
        assert_eq!(
            console.execute("registercommands").await,
            ConsoleOutcome::Output("No command publisher is configured.".to_string())
        );

        let console = console.with_publisher(Arc::new(Refuse));
        assert_eq!(
            console.execute("registercommands").await,
            ConsoleOutcome::Output(
                "Failed to register application commands - 401 Unauthorized".to_string()
            )
        );
    }

    #[derive(Default)]
    struct Accept {
        published: parking_lot::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandPublisher for Accept {
        async fn publish(
            &self,
            _: Option<&str>,
            manifests: &[CommandManifest],
        ) -> Result<(), BoxError> {
            self.published
                .lock()
                .extend(manifests.iter().map(|m| m.name.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn registercommands_rebuilds_registry_before_publishing() {
        let runtime = runtime();
        let before = runtime.engine().registry().find_command("ping").unwrap();
        let publisher = Arc::new(Accept::default());
        let console = Console::new(Arc::clone(&runtime)).with_publisher(publisher.clone());

        assert!(matches!(console.execute("reload").await, ConsoleOutcome::Output(_)));
        assert_eq!(
            console.execute("registercommands").await,
            ConsoleOutcome::Output("Successfully registered application commands.".to_string())
        );

        let after = runtime.engine().registry().find_command("ping").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*publisher.published.lock(), vec!["ping", "info", "reload"]);
    }

    #[tokio::test]
    async fn exit_requests_shutdown() {
        let runtime = runtime();
        let console = Console::new(Arc::clone(&runtime));
        assert_eq!(console.execute("exit").await, ConsoleOutcome::Exit);
        assert!(runtime.is_shutting_down());
    }
}
