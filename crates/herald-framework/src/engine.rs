//! The engine context.
//!
//! An [`Engine`] owns one independent set of dispatch state: the command
//! registry, the rate limiter, and the event bus, plus a shared reference to
//! the configuration binding that an external loader refreshes. Nothing is
//! process-global, so tests and multi-bot hosts can run several engines side
//! by side.
//!
//! ```rust,ignore
//! let engine = Arc::new(
//!     Engine::new(Arc::new(ConfigBinding::new(configs)))
//!         .with_policy(DispatchPolicy::default()),
//! );
//! engine.register_command(ping())?;
//! let dispatcher = Dispatcher::new(Arc::clone(&engine));
//! ```

use std::future::Future;
use std::sync::Arc;

use herald_core::{
    Clock, Command, CommandRegistry, ConfigBinding, EventBus, EventKind, IntoHandlerResult,
    LifecycleEvent, RateLimiter, RegistryResult, SubscriptionId, SystemClock,
};
use serde::{Deserialize, Serialize};

/// Switches that alter the dispatch pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchPolicy {
    /// Drop autocomplete requests for commands configured `enabled: false`.
    ///
    /// Off by default: autocomplete skips the enablement gate.
    pub autocomplete_requires_enabled: bool,
}

/// Owner of all per-instance dispatch state.
pub struct Engine {
    registry: CommandRegistry,
    config: Arc<ConfigBinding>,
    limiter: RateLimiter,
    events: EventBus,
    clock: Arc<dyn Clock>,
    policy: DispatchPolicy,
}

impl Engine {
    /// Creates an engine reading configuration from `config`.
    pub fn new(config: Arc<ConfigBinding>) -> Self {
        Self {
            registry: CommandRegistry::new(),
            config,
            limiter: RateLimiter::new(),
            events: EventBus::new(),
            clock: Arc::new(SystemClock),
            policy: DispatchPolicy::default(),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Declares a command. Fails on a duplicate name.
    pub fn register_command(&self, command: Command) -> RegistryResult<()> {
        self.registry.register_command(command)
    }

    /// Subscribes an event handler. Duplicates are allowed.
    pub fn register_event<F, Fut, R>(
        &self,
        kind: EventKind,
        once: bool,
        handler: F,
    ) -> SubscriptionId
    where
        F: Fn(LifecycleEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult<()> + 'static,
    {
        self.events.subscribe(kind, once, handler)
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Arc<ConfigBinding> {
        &self.config
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Current time according to the engine's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("configured", &self.config.len())
            .field("events", &self.events)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{CommandConfig, CommandContext, ManualClock};

    #[test]
    fn engines_are_independent() {
        let a = Engine::new(Arc::new(ConfigBinding::default()));
        let b = Engine::new(Arc::new(ConfigBinding::default()));
        a.register_command(Command::new("ping", |_ctx: CommandContext| async {}))
            .unwrap();

        assert_eq!(a.registry().len(), 1);
        assert!(b.registry().is_empty());
    }

    #[test]
    fn config_binding_is_shared_with_loader() {
        let binding = Arc::new(ConfigBinding::default());
        let engine = Engine::new(Arc::clone(&binding));
        binding.replace([("ping".to_string(), CommandConfig::new())].into());
        assert!(engine.config().resolve("ping").is_some());
    }

    #[test]
    fn injected_clock_is_used() {
        let clock = Arc::new(ManualClock::new(1234));
        let engine = Engine::new(Arc::new(ConfigBinding::default())).with_clock(clock.clone());
        assert_eq!(engine.now_ms(), 1234);
        clock.advance(6);
        assert_eq!(engine.now_ms(), 1240);
    }
}
