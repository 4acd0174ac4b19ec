//! Unified error types for the Herald core.
//!
//! This module provides the error taxonomy shared by every layer of the
//! engine. Dispatch-time rejections live in [`DispatchError`]; registration
//! failures in [`RegistryError`]; collaborator failures in [`TransportError`]
//! and [`ConfigSourceError`].

use std::fmt;

use thiserror::Error;

/// Boxed error returned by command and event handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors reported by the transport when acknowledging or replying.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The interaction was already acknowledged.
    #[error("interaction already acknowledged")]
    AlreadyAcknowledged,

    /// The interaction token expired before the reply was sent.
    #[error("interaction expired")]
    Expired,

    /// Message send failed.
    #[error("failed to send reply: {0}")]
    SendFailed(String),
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while declaring commands.
///
/// These are fatal to startup: a command set that cannot be registered cannot
/// be safely published either.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A command with the same name is already registered.
    #[error("command '{name}' is already registered")]
    DuplicateCommand {
        /// The conflicting command name.
        name: String,
    },

    /// The command name breaks the platform's naming rules.
    #[error("invalid command name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

// =============================================================================
// Handler Failure
// =============================================================================

/// Where a handler failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The handler panicked before returning its future.
    Initiation,
    /// The handler's future panicked while running.
    Panic,
    /// The handler returned an error.
    Error,
}

/// A failure raised by a command, autocomplete, or event handler.
///
/// The message carries full detail and is meant for the operational log
/// only; end users see [`DispatchError::user_message`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    kind: FailureKind,
    message: String,
}

impl HandlerFailure {
    /// Creates a failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wraps an error returned by a handler.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(FailureKind::Error, message)
    }

    /// Builds a failure from a caught panic payload.
    pub fn from_panic(kind: FailureKind, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(kind, message)
    }

    /// Returns where the failure surfaced.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the detailed failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Initiation => write!(f, "handler panicked on call: {}", self.message),
            FailureKind::Panic => write!(f, "handler panicked: {}", self.message),
            FailureKind::Error => write!(f, "handler returned an error: {}", self.message),
        }
    }
}

impl std::error::Error for HandlerFailure {}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Terminal outcomes of the command dispatch pipeline.
///
/// Every variant maps to exactly one generic user-visible reply via
/// [`user_message`](Self::user_message). None of them is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No command with this name is registered.
    #[error("unknown command '{name}'")]
    UnknownCommand { name: String },

    /// The command has no entry in the configuration binding.
    #[error("no configuration for command '{name}'")]
    MissingConfiguration { name: String },

    /// The command is configured with `enabled: false`.
    #[error("command '{name}' is disabled")]
    CommandDisabled { name: String },

    /// The command's global cooldown has not elapsed.
    #[error("command '{name}' is globally rate limited for another {remaining_ms} ms")]
    GlobalRateLimited { name: String, remaining_ms: u64 },

    /// The invoking user's cooldown for this command has not elapsed.
    #[error("user '{user}' is rate limited on '{name}' for another {remaining_ms} ms")]
    PerUserRateLimited {
        name: String,
        user: String,
        remaining_ms: u64,
    },

    /// The handler failed after dispatch.
    #[error("command '{name}' failed: {failure}")]
    HandlerFailure {
        name: String,
        failure: HandlerFailure,
    },
}

impl DispatchError {
    /// The reply shown to the invoking user. Never contains internal detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnknownCommand { .. } => "This command does not exist.",
            Self::MissingConfiguration { .. } => "No configuration exists for this command.",
            Self::CommandDisabled { .. } => "This command is disabled.",
            Self::GlobalRateLimited { .. } => "This command is currently under a global ratelimit.",
            Self::PerUserRateLimited { .. } => "You are currently ratelimited.",
            Self::HandlerFailure { .. } => "There was an error while running this command.",
        }
    }

    /// Returns the name of the command this error concerns.
    pub fn command_name(&self) -> &str {
        match self {
            Self::UnknownCommand { name }
            | Self::MissingConfiguration { name }
            | Self::CommandDisabled { name }
            | Self::GlobalRateLimited { name, .. }
            | Self::PerUserRateLimited { name, .. }
            | Self::HandlerFailure { name, .. } => name,
        }
    }
}

// =============================================================================
// Config Source Errors
// =============================================================================

/// Error surfaced by a [`ConfigSource`](crate::config::ConfigSource) reload.
#[derive(Debug, Error)]
#[error("configuration reload failed: {0}")]
pub struct ConfigSourceError(#[source] pub BoxError);

impl ConfigSourceError {
    /// Wraps any loader error.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for registration.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for command dispatch.
pub type DispatchResult<T = ()> = Result<T, DispatchError>;

/// Result type returned by handlers.
pub type HandlerResult<T = ()> = Result<T, BoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_hide_detail() {
        let err = DispatchError::HandlerFailure {
            name: "ping".into(),
            failure: HandlerFailure::new(FailureKind::Error, "database password is hunter2"),
        };
        assert!(!err.user_message().contains("hunter2"));
        assert!(err.to_string().contains("hunter2"));
    }

    #[test]
    fn failure_from_error_includes_sources() {
        let io = std::io::Error::other("disk on fire");
        let outer = ConfigSourceError::new(io);
        let failure = HandlerFailure::from_error(&outer);
        assert_eq!(failure.kind(), FailureKind::Error);
        assert!(failure.message().contains("disk on fire"));
    }

    #[test]
    fn failure_from_panic_payloads() {
        let f = HandlerFailure::from_panic(FailureKind::Panic, &"boom");
        assert_eq!(f.message(), "boom");
        let f = HandlerFailure::from_panic(FailureKind::Panic, &String::from("bang"));
        assert_eq!(f.message(), "bang");
        let f = HandlerFailure::from_panic(FailureKind::Initiation, &42_u8);
        assert_eq!(f.message(), "non-string panic payload");
    }
}
