//! # Herald
//!
//! A command and event dispatch engine for chat-platform bots.
//!
//! ## Overview
//!
//! Herald sits between a chat transport and the bot's commands. It keeps the
//! command registry, binds each command to its configuration, enforces
//! cooldowns, and fans lifecycle events out to subscribers. A failing handler
//! is logged and answered with a generic reply; it never takes the bot down.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  InteractionCreate  ┌────────────┐     ┌────────────────────────────────┐
//! │  Transport  │────────────────────▶│ Event Bus  │────▶│ Dispatcher                     │
//! │             │  Ready, Guild*, ... │            │     │  lookup → defer → config →     │
//! └─────────────┘                     └────────────┘     │  enabled → cooldowns → handler │
//!                                           │            └────────────────────────────────┘
//!                                           ▼
//!                                     event handlers
//! ```
//!
//! - **Runtime**: Loads configuration, initializes logging, wires everything up
//! - **Engine**: Owns registry, configuration binding, rate limiter, event bus
//! - **Dispatcher**: Runs the command pipeline; also a `tower::Service`
//! - **Commands**: Named handlers with options, autocompletes, cooldowns
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! fn ping() -> Command {
//!     Command::new("ping", |ctx: CommandContext| async move {
//!         ctx.respond(Reply::success("Pong!")).await
//!     })
//!     .description("Replies with pong.")
//!     .global_cooldown(Duration::from_secs(5))
//! }
//!
//! declare_command!(PING => ping);
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HeraldRuntime::builder().build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use herald_core as core;
pub use herald_framework as framework;
pub use herald_runtime as runtime;

pub use herald_core::declare_command;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use herald_runtime::{
        CommandPublisher, Console, ConsoleOutcome, HeraldRuntime, SessionReady,
    };

    // Command model and handler contexts
    pub use herald_core::prelude::*;

    // Events
    pub use herald_core::{EventBus, PublishReport};

    // Dispatch
    pub use herald_framework::{Dispatcher, Engine};

    pub use herald_core::declare_command;
    pub use std::time::Duration;
}
