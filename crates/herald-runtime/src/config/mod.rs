//! Configuration module for the Herald runtime.
//!
//! This module provides layered configuration loading and validation, plus
//! the file-backed [`FileConfigSource`] that feeds the engine's
//! configuration binding and reloads it on demand.

pub mod error;
pub mod loader;
pub mod schema;
pub mod source;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    HeraldConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig,
};
pub use source::FileConfigSource;
pub use validation::{validate_command_name, validate_config};
