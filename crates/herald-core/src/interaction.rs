//! Transport-facing interaction types.
//!
//! The chat-platform transport is an external collaborator. It hands the
//! engine command invocations and autocomplete requests through the
//! [`CommandInteraction`] and [`AutocompleteInteraction`] traits and receives
//! replies back through the same objects. Nothing here formats messages;
//! a [`Reply`] only says what kind of notice to show and its text.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportResult;

/// Maximum number of autocomplete choices the platform accepts.
pub const MAX_CHOICES: usize = 25;

// ============================================================================
// Identity
// ============================================================================

/// Platform identifier of the user who triggered an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Replies
// ============================================================================

/// Visual category of a reply; the transport decides how each one looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Success,
    Info,
    Warning,
    Error,
}

/// A reply sent back through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub kind: ReplyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
}

impl Reply {
    /// Creates a reply of the given kind.
    pub fn new(kind: ReplyKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: None,
            description: description.into(),
        }
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self::new(ReplyKind::Success, description)
    }

    pub fn info(description: impl Into<String>) -> Self {
        Self::new(ReplyKind::Info, description)
    }

    pub fn warning(description: impl Into<String>) -> Self {
        Self::new(ReplyKind::Warning, description)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new(ReplyKind::Error, description)
    }

    /// Sets a title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

// ============================================================================
// Autocomplete choices
// ============================================================================

/// Value carried by an autocomplete choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    String(String),
    Number(f64),
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: ChoiceValue,
}

impl Choice {
    /// A choice whose value equals its display name.
    pub fn string(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: ChoiceValue::String(name.clone()),
            name,
        }
    }

    /// A choice with a numeric value.
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: ChoiceValue::Number(value),
        }
    }
}

/// The option the user is currently typing into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusedOption {
    pub name: String,
    pub value: String,
}

impl FocusedOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Option values supplied with a command invocation, by option name.
pub type CommandOptions = HashMap<String, Value>;

// ============================================================================
// Interaction traits
// ============================================================================

/// A slash-command invocation delivered by the transport.
#[async_trait]
pub trait CommandInteraction: Send + Sync + 'static {
    /// Name of the invoked command.
    fn command_name(&self) -> &str;

    /// The invoking user.
    fn user(&self) -> &UserId;

    /// Option values supplied by the user.
    fn options(&self) -> &CommandOptions;

    /// Acknowledges the invocation so a reply can follow later.
    async fn defer_reply(&self) -> TransportResult<()>;

    /// Sends the first reply to a non-deferred invocation.
    async fn reply(&self, reply: Reply) -> TransportResult<()>;

    /// Replaces the deferred placeholder (or a previous reply).
    async fn edit_reply(&self, reply: Reply) -> TransportResult<()>;

    /// Returns a string option by name.
    fn string_option(&self, name: &str) -> Option<&str> {
        self.options().get(name).and_then(Value::as_str)
    }
}

/// An autocomplete request delivered by the transport.
#[async_trait]
pub trait AutocompleteInteraction: Send + Sync + 'static {
    /// Name of the command being typed.
    fn command_name(&self) -> &str;

    /// The user typing.
    fn user(&self) -> &UserId;

    /// The option being completed and its partial value.
    fn focused(&self) -> &FocusedOption;

    /// Sends the suggestion list.
    async fn respond(&self, choices: Vec<Choice>) -> TransportResult<()>;
}

/// Command-shaped payload of an `InteractionCreate` event.
#[derive(Clone)]
pub enum Interaction {
    Command(Arc<dyn CommandInteraction>),
    Autocomplete(Arc<dyn AutocompleteInteraction>),
}

impl Interaction {
    /// Name of the command this interaction targets.
    pub fn command_name(&self) -> &str {
        match self {
            Self::Command(i) => i.command_name(),
            Self::Autocomplete(i) => i.command_name(),
        }
    }
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(i) => f
                .debug_struct("Command")
                .field("command", &i.command_name())
                .field("user", i.user())
                .finish_non_exhaustive(),
            Self::Autocomplete(i) => f
                .debug_struct("Autocomplete")
                .field("command", &i.command_name())
                .field("focused", i.focused())
                .finish_non_exhaustive(),
        }
    }
}
