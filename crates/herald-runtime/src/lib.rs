//! Herald Runtime - Orchestration layer for the Herald command dispatch framework.
//!
//! This crate provides:
//! - Layered configuration loading and validation (`config`)
//! - Logging configuration (`LoggingBuilder`)
//! - Runtime orchestration (`HeraldRuntime`)
//! - Bulk command publication (`CommandPublisher`)
//! - The operational console (`Console`)
//! - The built-in `reload` command
//!
//! ```ignore
//! use std::sync::Arc;
//! use herald_runtime::HeraldRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Loads herald.toml from the current directory and initializes logging
//!     let runtime = Arc::new(HeraldRuntime::builder().build()?);
//!
//!     // Publish the command set once the transport reports it is ready
//!     runtime.publish_on_ready(publisher);
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod builtin;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod publish;
pub mod runtime;

// Re-exports
pub use builtin::reload_command;
pub use config::{ConfigError, ConfigLoader, ConfigResult, FileConfigSource, HeraldConfig};
pub use console::{Console, ConsoleCommand, ConsoleOutcome};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use publish::{CommandPublisher, publish_manifests};
pub use runtime::{HeraldRuntime, RuntimeBuilder, SessionReady};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
