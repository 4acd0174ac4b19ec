//! A line-based stdin transport.
//!
//! ```text
//! /ping                 invoke a command
//! /info name=rules      invoke with options (values parsed as JSON when possible)
//! ?info name ru         autocomplete the `name` option from the partial "ru"
//! appcmdlist            anything else goes to the operational console
//! ```
//!
//! Interactions are handed to the runtime without waiting for them, so a slow
//! command never blocks the next line; replies are printed as they arrive.

use std::sync::Arc;

use async_trait::async_trait;
use herald::core::{
    AutocompleteInteraction, CommandInteraction, CommandManifest, CommandOptions, FocusedOption,
    Interaction, TransportResult,
};
use herald::prelude::*;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Command {
        name: String,
        options: Vec<(String, Value)>,
    },
    Autocomplete {
        name: String,
        option: String,
        partial: String,
    },
    Console(String),
}

impl Line {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix('/') {
            let mut words = rest.split_whitespace();
            let name = words.next().unwrap_or_default().to_string();
            let options = words
                .filter_map(|word| word.split_once('='))
                .map(|(key, raw)| {
                    let value = serde_json::from_str(raw)
                        .unwrap_or_else(|_| Value::String(raw.to_string()));
                    (key.to_string(), value)
                })
                .collect();
            Self::Command { name, options }
        } else if let Some(rest) = line.strip_prefix('?') {
            let mut words = rest.split_whitespace();
            Self::Autocomplete {
                name: words.next().unwrap_or_default().to_string(),
                option: words.next().unwrap_or_default().to_string(),
                partial: words.next().unwrap_or_default().to_string(),
            }
        } else {
            Self::Console(line.to_string())
        }
    }
}

/// Prints the manifests instead of calling a platform API.
#[derive(Debug, Default)]
pub struct StdoutPublisher;

#[async_trait]
impl CommandPublisher for StdoutPublisher {
    async fn publish(
        &self,
        guild: Option<&str>,
        manifests: &[CommandManifest],
    ) -> Result<(), BoxError> {
        println!(
            "PUT commands (guild {}):\n{}",
            guild.unwrap_or("<global>"),
            serde_json::to_string_pretty(manifests)?
        );
        Ok(())
    }
}

pub fn render(command: &str, reply: &Reply) -> String {
    match &reply.title {
        Some(title) => format!("/{command} [{:?}] {title}: {}", reply.kind, reply.description),
        None => format!("/{command} [{:?}] {}", reply.kind, reply.description),
    }
}

// ============================================================================
// Interactions
// ============================================================================

/// A slash command typed on stdin.
#[derive(Debug)]
pub struct TypedCommand {
    name: String,
    user: UserId,
    options: CommandOptions,
}

impl TypedCommand {
    pub fn new(name: String, user: UserId, options: Vec<(String, Value)>) -> Self {
        Self {
            name,
            user,
            options: options.into_iter().collect(),
        }
    }
}

#[async_trait]
impl CommandInteraction for TypedCommand {
    fn command_name(&self) -> &str {
        &self.name
    }

    fn user(&self) -> &UserId {
        &self.user
    }

    fn options(&self) -> &CommandOptions {
        &self.options
    }

    async fn defer_reply(&self) -> TransportResult<()> {
        println!("/{} (thinking...)", self.name);
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> TransportResult<()> {
        println!("{}", render(&self.name, &reply));
        Ok(())
    }

    async fn edit_reply(&self, reply: Reply) -> TransportResult<()> {
        println!("{}", render(&self.name, &reply));
        Ok(())
    }
}

/// An autocomplete request typed on stdin.
#[derive(Debug)]
pub struct TypedAutocomplete {
    name: String,
    user: UserId,
    focused: FocusedOption,
}

#[async_trait]
impl AutocompleteInteraction for TypedAutocomplete {
    fn command_name(&self) -> &str {
        &self.name
    }

    fn user(&self) -> &UserId {
        &self.user
    }

    fn focused(&self) -> &FocusedOption {
        &self.focused
    }

    async fn respond(&self, choices: Vec<Choice>) -> TransportResult<()> {
        let names: Vec<&str> = choices.iter().map(|c| c.name.as_str()).collect();
        println!("?{} {}: {}", self.name, self.focused.name, names.join(", "));
        Ok(())
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Feeds stdin lines to the runtime.
pub struct ConsoleTransport {
    runtime: Arc<HeraldRuntime>,
    console: Console,
    user: UserId,
}

impl ConsoleTransport {
    pub fn new(runtime: Arc<HeraldRuntime>, console: Console, user: UserId) -> Self {
        Self {
            runtime,
            console,
            user,
        }
    }

    /// Reads until end of input or `exit`.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if !self.handle(&line).await {
                break;
            }
        }
        Ok(())
    }

    /// Handles one line; returns `false` once the console asked to exit.
    pub async fn handle(&self, line: &str) -> bool {
        match Line::parse(line) {
            Line::Command { name, options } => {
                let command = TypedCommand::new(name, self.user.clone(), options);
                self.deliver(Interaction::Command(Arc::new(command)));
            }
            Line::Autocomplete {
                name,
                option,
                partial,
            } => {
                let request = TypedAutocomplete {
                    name,
                    user: self.user.clone(),
                    focused: FocusedOption::new(option, partial),
                };
                self.deliver(Interaction::Autocomplete(Arc::new(request)));
            }
            Line::Console(text) => match self.console.execute(&text).await {
                ConsoleOutcome::Output(output) => println!("{output}"),
                ConsoleOutcome::Silent => {}
                ConsoleOutcome::Exit => return false,
            },
        }
        true
    }

    fn deliver(&self, interaction: Interaction) {
        let command = interaction.command_name().to_string();
        self.runtime
            .spawn_emit(LifecycleEvent::new(EventKind::InteractionCreate, interaction));
        debug!(%command, in_flight = self.runtime.in_flight(), "Interaction handed off");
    }
}
