//! Bulk publication of command manifests.
//!
//! The platform needs to be told which slash commands exist before users can
//! invoke them. The runtime collects the [`CommandManifest`]s of every
//! registered command and hands them, all at once, to a [`CommandPublisher`].

use async_trait::async_trait;
use herald_core::{BoxError, CommandManifest};
use tracing::{error, info};

use crate::error::{RuntimeError, RuntimeResult};

/// Pushes the full command set to the chat platform.
///
/// Publication replaces whatever was published before; it is never
/// incremental.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    /// Publishes `manifests` to `guild`, or globally when `guild` is `None`.
    async fn publish(
        &self,
        guild: Option<&str>,
        manifests: &[CommandManifest],
    ) -> Result<(), BoxError>;
}

/// Publishes `manifests` and logs the outcome.
pub async fn publish_manifests(
    publisher: &dyn CommandPublisher,
    guild: Option<&str>,
    manifests: &[CommandManifest],
) -> RuntimeResult<()> {
    match publisher.publish(guild, manifests).await {
        Ok(()) => {
            info!(
                commands = manifests.len(),
                guild = guild.unwrap_or("<global>"),
                "Successfully registered application commands."
            );
            Ok(())
        }
        Err(e) => {
            error!("Failed to register application commands - {e}");
            Err(RuntimeError::Publish(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture {
        seen: Mutex<Vec<(Option<String>, Vec<String>)>>,
    }

    #[async_trait]
    impl CommandPublisher for Capture {
        async fn publish(
            &self,
            guild: Option<&str>,
            manifests: &[CommandManifest],
        ) -> Result<(), BoxError> {
            let names = manifests.iter().map(|m| m.name.clone()).collect();
            self.seen.lock().push((guild.map(str::to_string), names));
            Ok(())
        }
    }

    struct Refuse;

    #[async_trait]
    impl CommandPublisher for Refuse {
        async fn publish(&self, _: Option<&str>, _: &[CommandManifest]) -> Result<(), BoxError> {
            Err("missing access".into())
        }
    }

    fn manifest(name: &str) -> CommandManifest {
        CommandManifest {
            name: name.to_string(),
            description: String::new(),
            options: Vec::new(),
            default_member_permissions: None,
        }
    }

    #[tokio::test]
    async fn publishes_whole_set_to_guild() {
        let capture = Capture::default();
        publish_manifests(&capture, Some("42"), &[manifest("ping"), manifest("info")])
            .await
            .unwrap();

        let seen = capture.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_deref(), Some("42"));
        assert_eq!(seen[0].1, vec!["ping", "info"]);
    }

    #[tokio::test]
    async fn failure_is_reported() {
        let err = publish_manifests(&Refuse, None, &[manifest("ping")])
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Publish(_)));
        assert_eq!(
            err.to_string(),
            "Failed to register application commands - missing access"
        );
    }
}
