//! Commands the runtime ships with.

use std::sync::Arc;

use herald_core::{Command, CommandContext, ConfigBinding, ConfigSource, HandlerResult, Reply};
use tracing::info;

/// `MANAGE_GUILD` permission bit.
pub const MANAGE_GUILD: &str = "32";

/// Builds the `reload` slash command.
///
/// The invoker is told the reload is underway before the configuration file
/// is re-read; a failed reload keeps the previous configuration and surfaces
/// as a handler error.
pub fn reload_command(binding: Arc<ConfigBinding>, source: Arc<dyn ConfigSource>) -> Command {
    Command::new("reload", move |ctx: CommandContext| {
        let binding = Arc::clone(&binding);
        let source = Arc::clone(&source);
        async move { reload(ctx, &binding, source.as_ref()).await }
    })
    .description("Reloads the bot.")
    .default_member_permissions(MANAGE_GUILD)
}

async fn reload(
    ctx: CommandContext,
    binding: &ConfigBinding,
    source: &dyn ConfigSource,
) -> HandlerResult {
    ctx.respond(
        Reply::warning("Moving the configuration from the config file to cache...")
            .with_title("Reloading"),
    )
    .await?;

    let commands = binding.refresh(source)?;
    info!(user = %ctx.user(), commands, "Configuration reloaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{
        CommandConfig, CommandConfigs, CommandInteraction, ConfigSourceError, ReplyKind,
    };
    use herald_framework::testing::{Recorded, RecordingCommand};
    use parking_lot::Mutex;

    struct Staged {
        next: Mutex<Option<CommandConfigs>>,
    }

    impl ConfigSource for Staged {
        fn current_config(&self) -> CommandConfigs {
            CommandConfigs::new()
        }

        fn reload(&self) -> Result<CommandConfigs, ConfigSourceError> {
            self.next
                .lock()
                .take()
                .ok_or_else(|| ConfigSourceError::new("file is gone"))
        }
    }

    fn invoke(deferred: bool) -> (Arc<RecordingCommand>, CommandContext) {
        let recording = Arc::new(RecordingCommand::new("reload", "admin"));
        let interaction: Arc<dyn CommandInteraction> = recording.clone();
        let ctx = CommandContext::new(interaction, Arc::new(CommandConfig::new()), deferred);
        (recording, ctx)
    }

    #[tokio::test]
    async fn reload_swaps_config_and_notifies() {
        let binding = Arc::new(ConfigBinding::default());
        let mut next = CommandConfigs::new();
        next.insert("ping".to_string(), CommandConfig::new());
        let source = Arc::new(Staged {
            next: Mutex::new(Some(next)),
        });

        let command = reload_command(Arc::clone(&binding), source);
        assert_eq!(command.name(), "reload");
        assert_eq!(
            command.manifest().default_member_permissions.as_deref(),
            Some(MANAGE_GUILD)
        );

        let (recording, ctx) = invoke(true);
        (command.handler())(ctx).await.unwrap();

        assert!(binding.resolve("ping").is_some());
        match recording.calls().as_slice() {
            [Recorded::EditReply(reply)] => {
                assert_eq!(reply.kind, ReplyKind::Warning);
                assert_eq!(reply.title.as_deref(), Some("Reloading"));
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_config() {
        let mut current = CommandConfigs::new();
        current.insert("info".to_string(), CommandConfig::new());
        let binding = Arc::new(ConfigBinding::new(current));
        let source = Arc::new(Staged {
            next: Mutex::new(None),
        });

        let command = reload_command(Arc::clone(&binding), source);
        let (recording, ctx) = invoke(false);
        assert!((command.handler())(ctx).await.is_err());

        assert!(binding.resolve("info").is_some());
        assert!(matches!(recording.calls().as_slice(), [Recorded::Reply(_)]));
    }
}
