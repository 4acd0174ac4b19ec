//! Command definitions.
//!
//! A [`Command`] bundles a unique name, the async handler that runs when the
//! command is invoked, optional autocomplete handlers keyed by option name,
//! and the dispatch policy knobs (auto-defer, cooldowns). Commands are built
//! once at startup and never mutated afterwards; a reload replaces the whole
//! set.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use herald_core::{Command, CommandContext, Reply};
//!
//! async fn ping(ctx: CommandContext) -> anyhow::Result<()> {
//!     ctx.respond(Reply::success("Pong!")).await?;
//!     Ok(())
//! }
//!
//! let cmd = Command::new("ping", ping)
//!     .description("Replies with Pong!")
//!     .global_cooldown(Duration::from_secs(5));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::CommandConfig;
use crate::error::{BoxError, HandlerResult, TransportResult};
use crate::interaction::{
    AutocompleteInteraction, Choice, CommandInteraction, FocusedOption, Reply, UserId,
};

// ============================================================================
// Handler return values
// ============================================================================

/// Conversion from a handler's return value into a [`HandlerResult`].
///
/// Implemented for `()`, `Vec<Choice>`, and any `Result<T, E>` whose error
/// converts into [`BoxError`] (including `anyhow::Error`).
pub trait IntoHandlerResult<T>: Send {
    fn into_handler_result(self) -> HandlerResult<T>;
}

impl IntoHandlerResult<()> for () {
    fn into_handler_result(self) -> HandlerResult<()> {
        Ok(())
    }
}

impl IntoHandlerResult<Vec<Choice>> for Vec<Choice> {
    fn into_handler_result(self) -> HandlerResult<Vec<Choice>> {
        Ok(self)
    }
}

impl<T: Send, E: Into<BoxError> + Send> IntoHandlerResult<T> for Result<T, E> {
    fn into_handler_result(self) -> HandlerResult<T> {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Handler contexts
// ============================================================================

/// Everything a command handler receives.
#[derive(Clone)]
pub struct CommandContext {
    pub interaction: Arc<dyn CommandInteraction>,
    pub config: Arc<CommandConfig>,
    deferred: bool,
}

impl CommandContext {
    pub fn new(
        interaction: Arc<dyn CommandInteraction>,
        config: Arc<CommandConfig>,
        deferred: bool,
    ) -> Self {
        Self {
            interaction,
            config,
            deferred,
        }
    }

    /// The invoking user.
    pub fn user(&self) -> &UserId {
        self.interaction.user()
    }

    /// Whether the dispatcher already deferred this invocation.
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Returns a string option by name.
    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.interaction.string_option(name)
    }

    /// Replies through `edit_reply` if deferred, `reply` otherwise.
    pub async fn respond(&self, reply: Reply) -> TransportResult<()> {
        if self.deferred {
            self.interaction.edit_reply(reply).await
        } else {
            self.interaction.reply(reply).await
        }
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("command", &self.interaction.command_name())
            .field("user", self.interaction.user())
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

/// Everything an autocomplete handler receives.
#[derive(Clone)]
pub struct AutocompleteContext {
    pub interaction: Arc<dyn AutocompleteInteraction>,
    pub command: Arc<Command>,
    pub focused: FocusedOption,
    pub config: Arc<CommandConfig>,
}

// ============================================================================
// Type-erased handlers
// ============================================================================

/// A type-erased command handler.
///
/// Calling it runs the user function up to its first await and returns the
/// rest as a future; a panic during that call is an initiation failure.
pub type CommandHandlerFn =
    Arc<dyn Fn(CommandContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A type-erased autocomplete handler.
pub type AutocompleteHandlerFn = Arc<
    dyn Fn(AutocompleteContext) -> BoxFuture<'static, HandlerResult<Vec<Choice>>> + Send + Sync,
>;

fn erase_command<F, Fut, R>(f: F) -> CommandHandlerFn
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult<()> + 'static,
{
    Arc::new(move |ctx| -> BoxFuture<'static, HandlerResult> {
        let fut = f(ctx);
        Box::pin(async move { fut.await.into_handler_result() })
    })
}

fn erase_autocomplete<F, Fut, R>(f: F) -> AutocompleteHandlerFn
where
    F: Fn(AutocompleteContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult<Vec<Choice>> + 'static,
{
    Arc::new(move |ctx| -> BoxFuture<'static, HandlerResult<Vec<Choice>>> {
        let fut = f(ctx);
        Box::pin(async move { fut.await.into_handler_result() })
    })
}

fn saturating_millis(cooldown: Duration) -> u64 {
    u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Declaration metadata
// ============================================================================

/// Longest command name the platform accepts.
pub const MAX_NAME_LEN: usize = 32;

/// Checks a command name against the platform's slash-command rules.
///
/// Names are 1 to [`MAX_NAME_LEN`] characters of lowercase letters, digits,
/// `-` and `_`. The error carries the reason the name was rejected.
pub fn check_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("longer than {MAX_NAME_LEN} characters"));
    }
    match name
        .chars()
        .find(|c| !(c.is_lowercase() || c.is_numeric() || *c == '-' || *c == '_'))
    {
        Some(c) => Err(format!("character '{c}' is not allowed")),
        None => Ok(()),
    }
}

/// Value type of a command option, as declared to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Attachment,
}

/// One declared option of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub autocomplete: bool,
}

impl CommandOption {
    pub fn new(name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            required: false,
            autocomplete: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Serialisable declaration of a command, pushed to the platform's
/// command-registration API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandManifest {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<String>,
}

// ============================================================================
// Command
// ============================================================================

/// A named, handler-bound unit of user-invoked functionality.
#[derive(Clone)]
pub struct Command {
    name: String,
    description: String,
    options: Vec<CommandOption>,
    default_member_permissions: Option<String>,
    handler: CommandHandlerFn,
    auto_defer: bool,
    autocompletes: HashMap<String, AutocompleteHandlerFn>,
    global_cooldown_ms: u64,
    per_user_cooldown_ms: u64,
}

impl Command {
    /// Creates a command with the given name and handler.
    ///
    /// Defaults: auto-defer on, no autocompletes, no cooldowns.
    pub fn new<F, Fut, R>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult<()> + 'static,
    {
        Self::from_boxed(name, erase_command(handler))
    }

    /// Creates a command from a pre-erased handler.
    pub fn from_boxed(name: impl Into<String>, handler: CommandHandlerFn) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            options: Vec::new(),
            default_member_permissions: None,
            handler,
            auto_defer: true,
            autocompletes: HashMap::new(),
            global_cooldown_ms: 0,
            per_user_cooldown_ms: 0,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declares an option. Options keep their declaration order.
    pub fn option(mut self, option: CommandOption) -> Self {
        let option = CommandOption {
            autocomplete: option.autocomplete || self.autocompletes.contains_key(&option.name),
            ..option
        };
        self.options.push(option);
        self
    }

    /// Restricts who may see the command by default (platform permission bits).
    pub fn default_member_permissions(mut self, permissions: impl Into<String>) -> Self {
        self.default_member_permissions = Some(permissions.into());
        self
    }

    /// Whether the dispatcher acknowledges the invocation before running the handler.
    pub fn auto_defer(mut self, auto_defer: bool) -> Self {
        self.auto_defer = auto_defer;
        self
    }

    /// Minimum time between any two dispatches of this command.
    pub fn global_cooldown(mut self, cooldown: Duration) -> Self {
        self.global_cooldown_ms = saturating_millis(cooldown);
        self
    }

    /// Minimum time between two dispatches of this command by the same user.
    pub fn per_user_cooldown(mut self, cooldown: Duration) -> Self {
        self.per_user_cooldown_ms = saturating_millis(cooldown);
        self
    }

    /// Registers an autocomplete handler for the named option.
    pub fn autocomplete<F, Fut, R>(mut self, option: impl Into<String>, handler: F) -> Self
    where
        F: Fn(AutocompleteContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult<Vec<Choice>> + 'static,
    {
        let option = option.into();
        if let Some(declared) = self.options.iter_mut().find(|o| o.name == option) {
            declared.autocomplete = true;
        }
        self.autocompletes.insert(option, erase_autocomplete(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &[CommandOption] {
        &self.options
    }

    pub fn handler(&self) -> &CommandHandlerFn {
        &self.handler
    }

    pub fn is_auto_defer(&self) -> bool {
        self.auto_defer
    }

    pub fn autocomplete_for(&self, option: &str) -> Option<&AutocompleteHandlerFn> {
        self.autocompletes.get(option)
    }

    pub fn global_cooldown_ms(&self) -> u64 {
        self.global_cooldown_ms
    }

    pub fn per_user_cooldown_ms(&self) -> u64 {
        self.per_user_cooldown_ms
    }

    /// Declaration snapshot for publication.
    pub fn manifest(&self) -> CommandManifest {
        CommandManifest {
            name: self.name.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
            default_member_permissions: self.default_member_permissions.clone(),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut autocompletes: Vec<&str> = self.autocompletes.keys().map(String::as_str).collect();
        autocompletes.sort_unstable();
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("auto_defer", &self.auto_defer)
            .field("autocompletes", &autocompletes)
            .field("global_cooldown_ms", &self.global_cooldown_ms)
            .field("per_user_cooldown_ms", &self.per_user_cooldown_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_ctx: CommandContext) {}

    #[test]
    fn defaults_match_declaration_contract() {
        let cmd = Command::new("ping", noop);
        assert_eq!(cmd.name(), "ping");
        assert!(cmd.is_auto_defer());
        assert_eq!(cmd.global_cooldown_ms(), 0);
        assert_eq!(cmd.per_user_cooldown_ms(), 0);
        assert!(cmd.autocomplete_for("anything").is_none());
    }

    #[test]
    fn autocomplete_marks_declared_option_either_order() {
        let before = Command::new("info", noop)
            .option(CommandOption::new("name", OptionKind::String).required(true))
            .autocomplete("name", |_ctx: AutocompleteContext| async { Vec::<Choice>::new() });
        let after = Command::new("info", noop)
            .autocomplete("name", |_ctx: AutocompleteContext| async { Vec::<Choice>::new() })
            .option(CommandOption::new("name", OptionKind::String).required(true));

        assert!(before.options()[0].autocomplete);
        assert!(after.options()[0].autocomplete);
    }

    #[test]
    fn manifest_serialises_declaration() {
        let cmd = Command::new("reload", noop)
            .description("Reloads the bot.")
            .default_member_permissions("32")
            .global_cooldown(Duration::from_secs(5));
        let json = serde_json::to_value(cmd.manifest()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "reload",
                "description": "Reloads the bot.",
                "default_member_permissions": "32"
            })
        );
        assert_eq!(cmd.global_cooldown_ms(), 5000);
    }

    #[test]
    fn oversized_cooldown_saturates() {
        let cmd = Command::new("ping", noop)
            .global_cooldown(Duration::MAX)
            .per_user_cooldown(Duration::from_millis(1500));
        assert_eq!(cmd.global_cooldown_ms(), u64::MAX);
        assert_eq!(cmd.per_user_cooldown_ms(), 1500);
    }

    #[test]
    fn name_rule() {
        assert!(check_name("ping").is_ok());
        assert!(check_name("generate-lcc-lore").is_ok());
        assert!(check_name("snake_case2").is_ok());
        assert_eq!(check_name(""), Err("name is empty".to_string()));
        assert_eq!(check_name("Ping"), Err("character 'P' is not allowed".to_string()));
        assert!(check_name("two words").is_err());
        assert!(check_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(check_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
