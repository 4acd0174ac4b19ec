//! Main runtime orchestration.
//!
//! The runtime loads configuration, initializes logging, builds an
//! [`Engine`], registers every command it knows about, and attaches a
//! [`Dispatcher`] to the engine's event bus. Transports then only need to
//! [`emit`](HeraldRuntime::emit) lifecycle events, or hand them off with
//! [`spawn_emit`](HeraldRuntime::spawn_emit) so a slow handler never holds
//! up the next event.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use herald_runtime::HeraldRuntime;
//!
//! let runtime = HeraldRuntime::builder()
//!     .config_file("config/herald.toml")
//!     .command(ping())
//!     .build()?;
//!
//! runtime
//!     .emit(LifecycleEvent::new(EventKind::InteractionCreate, interaction))
//!     .await;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use herald_core::{
    Clock, Command, ConfigBinding, ConfigSource, EventKind, LifecycleEvent, PublishReport,
    SubscriptionId, discovered_commands,
};
use herald_framework::{Dispatcher, Engine};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, warn};

use crate::builtin::reload_command;
use crate::config::{ConfigLoader, FileConfigSource, HeraldConfig};
use crate::error::RuntimeResult;
use crate::logging;
use crate::publish::{CommandPublisher, publish_manifests};

/// Payload of the [`EventKind::Ready`] event: the session is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReady {
    /// Display tag of the bot account.
    pub user_tag: String,
}

impl SessionReady {
    pub fn new(user_tag: impl Into<String>) -> Self {
        Self {
            user_tag: user_tag.into(),
        }
    }
}

// =============================================================================
// Command set
// =============================================================================

/// Where the registry's commands come from; re-evaluated on every
/// [`HeraldRuntime::reload_commands`].
struct CommandSet {
    discovery: bool,
    builtin_reload: bool,
    explicit: Vec<Command>,
}

impl CommandSet {
    fn assemble(
        &self,
        binding: &Arc<ConfigBinding>,
        source: &Arc<FileConfigSource>,
    ) -> Vec<Command> {
        let mut commands = Vec::new();
        if self.discovery {
            commands.extend(discovered_commands());
        }
        commands.extend(self.explicit.iter().cloned());
        if self.builtin_reload {
            let source: Arc<dyn ConfigSource> = source.clone();
            commands.push(reload_command(Arc::clone(binding), source));
        }
        commands
    }

    /// Swaps the engine's registry for a freshly assembled set.
    fn rebuild(&self, engine: &Engine, source: &Arc<FileConfigSource>) -> RuntimeResult<usize> {
        let commands = self.assemble(engine.config(), source);
        let count = engine.registry().replace_all(commands)?;
        Ok(count)
    }
}

// =============================================================================
// HeraldRuntime
// =============================================================================

/// The main Herald runtime.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Arc::new(HeraldRuntime::builder().build()?);
/// runtime.publish_on_ready(publisher);
/// runtime.run().await?;
/// ```
pub struct HeraldRuntime {
    source: Arc<FileConfigSource>,
    engine: Arc<Engine>,
    dispatcher: Dispatcher,
    commands: Arc<CommandSet>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl HeraldRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Returns a copy of the active configuration.
    pub fn config(&self) -> HeraldConfig {
        self.source.config()
    }

    /// Returns the engine.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Returns the dispatcher attached to the engine's event bus.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the registered command names in registration order.
    pub fn command_names(&self) -> Vec<String> {
        self.engine
            .registry()
            .list_commands()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Re-reads the configuration file and swaps in the per-command config.
    ///
    /// Logging and dispatch policy are fixed at startup.
    pub fn reload(&self) -> RuntimeResult<usize> {
        let count = self.engine.config().refresh(self.source.as_ref())?;
        Ok(count)
    }

    /// Rebuilds the registry from discovery, explicit, and built-in commands.
    ///
    /// Cooldown state is keyed by command name and survives the swap. A
    /// duplicate or invalid name leaves the current registry in place.
    pub fn reload_commands(&self) -> RuntimeResult<usize> {
        self.commands.rebuild(&self.engine, &self.source)
    }

    /// Publishes every registered command to the configured main guild.
    pub async fn publish(&self, publisher: &dyn CommandPublisher) -> RuntimeResult<()> {
        publish_to(&self.engine, &self.source, publisher).await
    }

    /// Rebuilds the registry, then publishes it.
    ///
    /// Nothing is published when the rebuild fails.
    pub async fn register_commands(
        &self,
        publisher: &dyn CommandPublisher,
    ) -> RuntimeResult<usize> {
        register_to(&self.engine, &self.source, &self.commands, publisher).await
    }

    /// Registers the command set once, when the first `Ready` event arrives.
    pub fn publish_on_ready(&self, publisher: Arc<dyn CommandPublisher>) -> SubscriptionId {
        let engine = Arc::clone(&self.engine);
        let source = Arc::clone(&self.source);
        let commands = Arc::clone(&self.commands);
        self.engine
            .events()
            .subscribe(EventKind::Ready, true, move |_event: LifecycleEvent| {
                let engine = Arc::clone(&engine);
                let source = Arc::clone(&source);
                let commands = Arc::clone(&commands);
                let publisher = Arc::clone(&publisher);
                async move {
                    register_to(&engine, &source, &commands, publisher.as_ref())
                        .await
                        .map(|_| ())
                }
            })
    }

    /// Delivers a lifecycle event to every subscriber and waits for all of
    /// them to settle.
    pub async fn emit(&self, event: LifecycleEvent) -> PublishReport {
        self.engine.events().publish(event).await
    }

    /// Delivers a lifecycle event on a background task and returns at once.
    ///
    /// The handle yields `None` when shutdown cut the delivery short. Once
    /// shutdown has been requested no new delivery is started.
    pub fn spawn_emit(&self, event: LifecycleEvent) -> JoinHandle<Option<PublishReport>> {
        let engine = Arc::clone(&self.engine);
        let shutdown = self.shutdown.clone();
        let kind = event.kind();
        let delivery = async move {
            if shutdown.is_cancelled() {
                warn!(event = %kind, "Event dropped, runtime is shutting down");
                return None;
            }
            tokio::select! {
                report = engine.events().publish(event) => Some(report),
                _ = shutdown.cancelled() => {
                    debug!(event = %kind, "Event delivery cancelled by shutdown");
                    None
                }
            }
        };
        self.tasks.spawn(delivery.in_current_span())
    }

    /// Returns how many [`spawn_emit`](Self::spawn_emit) deliveries are
    /// still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Returns a token that is cancelled when the runtime stops.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Asks a running runtime to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Returns whether shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Runs the runtime until a shutdown signal is received.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Herald runtime is now running. Press Ctrl+C to stop.");

        tokio::select! {
            signal = wait_for_signal() => signal?,
            _ = self.shutdown.cancelled() => info!("Shutdown requested"),
        }

        self.stop().await;
        Ok(())
    }

    /// Runs the runtime with a custom shutdown future.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {}
            _ = self.shutdown.cancelled() => {}
        }

        self.stop().await;
        Ok(())
    }

    async fn stop(&self) {
        self.shutdown.cancel();
        self.tasks.close();
        if !self.tasks.is_empty() {
            debug!(in_flight = self.tasks.len(), "Waiting for event deliveries");
        }
        self.tasks.wait().await;
        info!("Herald runtime stopped");
    }
}

impl std::fmt::Debug for HeraldRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeraldRuntime")
            .field("engine", &self.engine)
            .field("shutting_down", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn register_to(
    engine: &Engine,
    source: &Arc<FileConfigSource>,
    commands: &CommandSet,
    publisher: &dyn CommandPublisher,
) -> RuntimeResult<usize> {
    let count = commands.rebuild(engine, source)?;
    publish_to(engine, source, publisher).await?;
    Ok(count)
}

async fn publish_to(
    engine: &Engine,
    source: &FileConfigSource,
    publisher: &dyn CommandPublisher,
) -> RuntimeResult<()> {
    let manifests = engine.registry().manifests();
    let guild = source.config().main_guild;
    publish_manifests(publisher, guild.as_deref(), &manifests).await
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_signal() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            ctrl_c = signal::ctrl_c() => {
                ctrl_c?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`HeraldRuntime`].
///
/// # Example
///
/// ```rust,ignore
/// let runtime = HeraldRuntime::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .command(ping())
///     .without_builtin_reload()
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    commands: CommandSet,
    clock: Option<Arc<dyn Clock>>,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            commands: CommandSet {
                discovery: true,
                builtin_reload: true,
                explicit: Vec::new(),
            },
            clock: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: HeraldConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Registers a command alongside the discovered ones.
    pub fn command(mut self, command: Command) -> Self {
        self.commands.explicit.push(command);
        self
    }

    /// Registers several commands.
    pub fn commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.explicit.extend(commands);
        self
    }

    /// Skips commands declared with `declare_command!`.
    pub fn without_discovery(mut self) -> Self {
        self.commands.discovery = false;
        self
    }

    /// Skips the built-in `reload` command.
    pub fn without_builtin_reload(mut self) -> Self {
        self.commands.builtin_reload = false;
        self
    }

    /// Replaces the engine's time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Builds the runtime.
    ///
    /// Fails if the configuration cannot be loaded or validated, or if two
    /// commands share a name.
    pub fn build(self) -> RuntimeResult<HeraldRuntime> {
        let source = Arc::new(FileConfigSource::load(self.config_loader)?);
        let config = source.config();

        if self.init_logging {
            logging::init_from_config(&config.logging, config.debug);
        }

        let binding = Arc::new(ConfigBinding::from_source(source.as_ref()));
        let mut engine = Engine::new(Arc::clone(&binding)).with_policy(config.dispatch.clone());
        if let Some(clock) = self.clock {
            engine = engine.with_clock(clock);
        }
        let engine = Arc::new(engine);

        for command in self.commands.assemble(&binding, &source) {
            engine.register_command(command)?;
        }

        engine
            .events()
            .subscribe(EventKind::Ready, false, |event: LifecycleEvent| async move {
                if let Some(ready) = event.payload::<SessionReady>() {
                    info!("Logged in as {}", ready.user_tag);
                }
            });

        let dispatcher = Dispatcher::new(Arc::clone(&engine));
        dispatcher.attach(engine.events());

        info!(
            commands = engine.registry().len(),
            configured = binding.len(),
            debug = config.debug,
            "Runtime initialized from configuration"
        );
        debug!(names = ?binding.command_names(), "Configured commands");

        Ok(HeraldRuntime {
            source,
            engine,
            dispatcher,
            commands: Arc::new(self.commands),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
