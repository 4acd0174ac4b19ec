//! Command and autocomplete dispatch.
//!
//! The [`Dispatcher`] runs one policy pipeline per inbound command
//! invocation. Each step can end the dispatch with a user-visible reply:
//!
//! 1. Resolve the command by name
//! 2. Acknowledge (auto-defer) if the command asks for it
//! 3. Resolve the command's configuration
//! 4. Check that the command is enabled
//! 5. Check the global cooldown
//! 6. Check the caller's per-user cooldown
//! 7. Start the handler, then record both cooldowns
//! 8. Report a handler failure with a generic reply
//!
//! Steps 5 to 7 run under one rate-limiter lock, so the cooldown gates and
//! the recording are a single step relative to any other dispatch.
//!
//! Autocomplete requests take a shorter path: unknown commands and missing
//! options are dropped silently, there are no cooldowns, and the enablement
//! gate only applies when [`DispatchPolicy::autocomplete_requires_enabled`]
//! is set.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(engine);
//! dispatcher.attach(engine.events());
//! engine.events().publish(LifecycleEvent::new(EventKind::InteractionCreate, interaction)).await;
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use herald_core::guard::{initiate, settle};
use herald_core::{
    AutocompleteContext, AutocompleteInteraction, Command, CommandConfig, CommandContext,
    CommandInteraction, DispatchError, DispatchResult, EventBus, EventKind, HandlerFailure,
    HandlerResult, Interaction, LifecycleEvent, MAX_CHOICES, Reply, SubscriptionId,
};
use tower::{Service, ServiceBuilder, ServiceExt};
use tracing::{Instrument, Level, debug, error, span, warn};

use crate::engine::Engine;
use crate::outcome::OutcomeLayer;

/// How an autocomplete request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutocompleteOutcome {
    /// Choices were sent; carries how many.
    Responded(usize),
    /// No command with this name; nothing sent.
    UnknownCommand,
    /// The command has no configuration; nothing sent.
    MissingConfiguration,
    /// The command is disabled and the policy gates autocomplete.
    Disabled,
    /// The command has no handler for the focused option; nothing sent.
    NoHandler,
    /// The handler failed; nothing sent.
    Failed(HandlerFailure),
}

impl AutocompleteOutcome {
    fn into_result(self, command: &str) -> DispatchResult {
        match self {
            Self::Failed(failure) => Err(DispatchError::HandlerFailure {
                name: command.to_string(),
                failure,
            }),
            _ => Ok(()),
        }
    }
}

/// The dispatch pipeline, bound to one [`Engine`].
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<Engine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Dispatches any command-shaped interaction.
    pub async fn dispatch(&self, interaction: Interaction) -> DispatchResult {
        match interaction {
            Interaction::Command(i) => self.dispatch_command(i).await,
            Interaction::Autocomplete(i) => {
                let name = i.command_name().to_string();
                self.dispatch_autocomplete(i).await.into_result(&name)
            }
        }
    }

    /// Runs the command pipeline for one invocation.
    ///
    /// Every `Err` has already been reported to the user with
    /// [`DispatchError::user_message`].
    pub async fn dispatch_command(
        &self,
        interaction: Arc<dyn CommandInteraction>,
    ) -> DispatchResult {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            command = %interaction.command_name(),
            user = %interaction.user(),
        );
        self.run_command(interaction).instrument(span).await
    }

    async fn run_command(&self, interaction: Arc<dyn CommandInteraction>) -> DispatchResult {
        let name = interaction.command_name().to_string();

        let Some(command) = self.engine.registry().find_command(&name) else {
            return reject(&*interaction, false, DispatchError::UnknownCommand { name }).await;
        };

        let deferred = command.is_auto_defer() && acknowledge(&*interaction).await;

        let Some(config) = self.engine.config().resolve(&name) else {
            warn!(command = %name, "No configuration exists for command");
            return reject(
                &*interaction,
                deferred,
                DispatchError::MissingConfiguration { name },
            )
            .await;
        };

        if !config.is_enabled() {
            return reject(&*interaction, deferred, DispatchError::CommandDisabled { name }).await;
        }

        let pending = match self.start(&command, &interaction, config, deferred) {
            Ok(Ok(pending)) => pending,
            Ok(Err(failure)) => return fail(&*interaction, deferred, name, failure).await,
            Err(rejection) => return reject(&*interaction, deferred, rejection).await,
        };

        match settle(pending).await {
            Ok(()) => Ok(()),
            Err(failure) => fail(&*interaction, deferred, name, failure).await,
        }
    }

    /// Checks both cooldowns, starts the handler, and records the cooldowns,
    /// all under one rate-limiter lock.
    ///
    /// The outer `Err` is a cooldown rejection; the inner one a panic while
    /// starting the handler, in which case nothing is recorded.
    fn start(
        &self,
        command: &Arc<Command>,
        interaction: &Arc<dyn CommandInteraction>,
        config: Arc<CommandConfig>,
        deferred: bool,
    ) -> Result<Result<BoxFuture<'static, HandlerResult>, HandlerFailure>, DispatchError> {
        let user = interaction.user();
        let now = self.engine.now_ms();
        let mut limits = self.engine.limiter().lock();

        if let Some(remaining_ms) = limits.remaining_global(command, now) {
            return Err(DispatchError::GlobalRateLimited {
                name: command.name().to_string(),
                remaining_ms,
            });
        }
        if let Some(remaining_ms) = limits.remaining_per_user(user, command, now) {
            return Err(DispatchError::PerUserRateLimited {
                name: command.name().to_string(),
                user: user.to_string(),
                remaining_ms,
            });
        }

        debug!("Running command {} from user {}", command.name(), user);
        let ctx = CommandContext::new(Arc::clone(interaction), config, deferred);
        let started = initiate(|| (command.handler())(ctx));
        if started.is_ok() {
            limits.record_global(command, now);
            limits.record_per_user(user, command, now);
        }
        Ok(started)
    }

    /// Runs the autocomplete pipeline for one request.
    pub async fn dispatch_autocomplete(
        &self,
        interaction: Arc<dyn AutocompleteInteraction>,
    ) -> AutocompleteOutcome {
        let span = span!(
            Level::DEBUG,
            "autocomplete",
            command = %interaction.command_name(),
            option = %interaction.focused().name,
        );
        self.run_autocomplete(interaction).instrument(span).await
    }

    async fn run_autocomplete(
        &self,
        interaction: Arc<dyn AutocompleteInteraction>,
    ) -> AutocompleteOutcome {
        let name = interaction.command_name();

        let Some(command) = self.engine.registry().find_command(name) else {
            return AutocompleteOutcome::UnknownCommand;
        };

        let Some(config) = self.engine.config().resolve(name) else {
            warn!(command = %name, "No configuration exists for command");
            return AutocompleteOutcome::MissingConfiguration;
        };

        if self.engine.policy().autocomplete_requires_enabled && !config.is_enabled() {
            debug!(command = %name, "Autocomplete dropped for disabled command");
            return AutocompleteOutcome::Disabled;
        }

        let focused = interaction.focused().clone();
        let Some(handler) = command.autocomplete_for(&focused.name).cloned() else {
            return AutocompleteOutcome::NoHandler;
        };

        let ctx = AutocompleteContext {
            interaction: Arc::clone(&interaction),
            command: Arc::clone(&command),
            focused,
            config,
        };
        let mut choices = match initiate(|| handler(ctx)) {
            Ok(pending) => match settle(pending).await {
                Ok(choices) => choices,
                Err(failure) => return autocomplete_failed(name, failure),
            },
            Err(failure) => return autocomplete_failed(name, failure),
        };

        choices.truncate(MAX_CHOICES);
        let count = choices.len();
        if let Err(e) = interaction.respond(choices).await {
            warn!(command = %name, error = %e, "Failed to send autocomplete choices");
        }
        AutocompleteOutcome::Responded(count)
    }

    /// Subscribes this dispatcher to `InteractionCreate` events on `bus`.
    ///
    /// The event payload must be an [`Interaction`]; anything else is logged
    /// and ignored. Dispatch rejections and failures are absorbed by
    /// [`OutcomeLayer`] so they never count as event-handler failures.
    pub fn attach(&self, bus: &EventBus) -> SubscriptionId {
        let service = ServiceBuilder::new()
            .layer(OutcomeLayer)
            .service(self.clone());
        bus.subscribe(
            EventKind::InteractionCreate,
            false,
            move |event: LifecycleEvent| {
                let service = service.clone();
                let interaction = event.payload::<Interaction>().cloned();
                async move {
                    match interaction {
                        Some(interaction) => service.oneshot(interaction).await,
                        None => {
                            warn!("InteractionCreate event without an interaction payload");
                            Ok(())
                        }
                    }
                }
            },
        )
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("engine", &self.engine)
            .finish()
    }
}

impl Service<Interaction> for Dispatcher {
    type Response = ();
    type Error = DispatchError;
    type Future = BoxFuture<'static, DispatchResult>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, interaction: Interaction) -> Self::Future {
        let this = self.clone();
        async move { this.dispatch(interaction).await }.boxed()
    }
}

// ============================================================================
// Reply helpers
// ============================================================================

/// Defers the reply; on transport failure the dispatch continues undeferred.
async fn acknowledge(interaction: &dyn CommandInteraction) -> bool {
    match interaction.defer_reply().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Failed to defer reply");
            false
        }
    }
}

async fn send(interaction: &dyn CommandInteraction, deferred: bool, reply: Reply) {
    let sent = if deferred {
        interaction.edit_reply(reply).await
    } else {
        interaction.reply(reply).await
    };
    if let Err(e) = sent {
        warn!(error = %e, "Failed to send reply");
    }
}

async fn reject(
    interaction: &dyn CommandInteraction,
    deferred: bool,
    err: DispatchError,
) -> DispatchResult {
    debug!(reason = %err, "Dispatch rejected");
    send(interaction, deferred, Reply::error(err.user_message())).await;
    Err(err)
}

async fn fail(
    interaction: &dyn CommandInteraction,
    deferred: bool,
    name: String,
    failure: HandlerFailure,
) -> DispatchResult {
    error!(
        command = %name,
        user = %interaction.user(),
        error = %failure,
        "Error while running command"
    );
    let err = DispatchError::HandlerFailure { name, failure };
    send(interaction, deferred, Reply::error(err.user_message())).await;
    Err(err)
}

fn autocomplete_failed(name: &str, failure: HandlerFailure) -> AutocompleteOutcome {
    error!(command = %name, error = %failure, "Error while running autocomplete");
    AutocompleteOutcome::Failed(failure)
}
