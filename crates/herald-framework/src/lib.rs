//! # Herald Framework
//!
//! The dispatch layer of the Herald command dispatch framework.
//!
//! This layer provides:
//! - [`Engine`]: the context object owning registry, limiter, and event bus
//! - [`Dispatcher`]: the command and autocomplete pipelines, also usable as a
//!   tower [`Service`](tower::Service) over [`Interaction`](herald_core::Interaction)
//! - [`OutcomeLayer`]: middleware that absorbs dispatch rejections
//!
//! The `testing` feature adds recording interactions for tests.
//!
//! Transports either call [`Dispatcher::dispatch`] directly or publish
//! `InteractionCreate` events on a bus the dispatcher is
//! [attached](Dispatcher::attach) to.

pub mod dispatcher;
pub mod engine;
pub mod outcome;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use dispatcher::{AutocompleteOutcome, Dispatcher};
pub use engine::{DispatchPolicy, Engine};
pub use outcome::{OutcomeLayer, OutcomeService};
