//! # Herald Core
//!
//! The core engine of the Herald command dispatch framework.
//!
//! This crate holds the state a chat bot needs to route slash commands and
//! lifecycle events: which commands exist, how each one is configured, and
//! when each command may run again. It knows nothing about any particular
//! chat platform; the transport is reached only through the traits in
//! [`interaction`].
//!
//! ## Building Blocks
//!
//! - **Registry**: name-indexed command set ([`CommandRegistry`])
//! - **Configuration Binding**: hot-swappable per-command config snapshot ([`ConfigBinding`])
//! - **Rate Limiter**: global and per-user cooldowns ([`RateLimiter`])
//! - **Event Bus**: isolated fan-out of lifecycle events ([`EventBus`])
//! - **Isolation**: panic and error capture around handler calls ([`guard`])
//!
//! The dispatch pipeline that ties these together lives in `herald-framework`.
//!
//! ```text
//! ┌───────────┐     ┌────────────┐     ┌──────────┐     ┌─────────┐
//! │ Transport │────▶│  Registry  │────▶│  Config  │────▶│ Limiter │──▶ handler
//! └───────────┘     └────────────┘     └──────────┘     └─────────┘
//!       │
//!       └──────────▶ EventBus ──▶ subscriber, subscriber, ...
//! ```

pub mod clock;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod event;
pub mod guard;
pub mod interaction;
pub mod ratelimit;
pub mod registry;

#[doc(hidden)]
pub use linkme;

pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{
    AutocompleteContext, AutocompleteHandlerFn, Command, CommandContext, CommandHandlerFn,
    CommandManifest, CommandOption, IntoHandlerResult, OptionKind, check_name,
};
pub use config::{CommandConfig, CommandConfigs, ConfigBinding, ConfigSource};
pub use discovery::{COMMANDS, CommandCtor, discovered_commands};
pub use error::{
    BoxError, ConfigSourceError, DispatchError, DispatchResult, FailureKind, HandlerFailure,
    HandlerResult, RegistryError, RegistryResult, TransportError, TransportResult,
};
pub use event::{EventBus, EventHandlerFn, EventKind, LifecycleEvent, PublishReport, SubscriptionId};
pub use interaction::{
    AutocompleteInteraction, Choice, ChoiceValue, CommandInteraction, CommandOptions,
    FocusedOption, Interaction, MAX_CHOICES, Reply, ReplyKind, UserId,
};
pub use ratelimit::{RateLimitGuard, RateLimiter};
pub use registry::CommandRegistry;

/// Prelude for common imports.
pub mod prelude {
    pub use super::command::{
        AutocompleteContext, Command, CommandContext, CommandOption, OptionKind,
    };
    pub use super::config::CommandConfig;
    pub use super::error::{BoxError, HandlerResult};
    pub use super::event::{EventKind, LifecycleEvent};
    pub use super::interaction::{Choice, Reply, UserId};
}
