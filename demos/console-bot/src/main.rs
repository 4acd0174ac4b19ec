//! Console Bot Example
//!
//! A demonstration of the Herald framework driven from the terminal. Slash
//! commands, autocomplete requests, and operational console commands are all
//! typed on stdin; replies are printed back.
//!
//! # Usage
//!
//! ```bash
//! cd demos/console-bot
//! cargo run -- --register-commands
//! ```
//!
//! Then type `/ping`, `/info name=rules`, `?info name r`, `appcmdlist`, or
//! `exit`.

mod commands;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use herald::prelude::*;
use tracing::info;

use crate::transport::{ConsoleTransport, StdoutPublisher};

#[derive(Debug, Parser)]
#[command(version, about = "Herald console bot")]
struct Args {
    /// Configuration file; defaults to herald.toml in the current directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile (e.g. "development", "production").
    #[arg(short, long)]
    profile: Option<String>,

    /// Publish application commands once the session is ready.
    #[arg(long)]
    register_commands: bool,

    /// User id the typed commands are sent as.
    #[arg(long, default_value = "operator")]
    user: String,

    /// Tag reported for the bot account.
    #[arg(long, default_value = "herald#0001")]
    bot_tag: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = HeraldRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let runtime = Arc::new(builder.build()?);

    let publisher: Arc<dyn CommandPublisher> = Arc::new(StdoutPublisher);
    if args.register_commands {
        runtime.publish_on_ready(Arc::clone(&publisher));
    }

    runtime
        .emit(LifecycleEvent::new(
            EventKind::Ready,
            SessionReady::new(args.bot_tag.as_str()),
        ))
        .await;

    let console = Console::new(Arc::clone(&runtime)).with_publisher(publisher);
    let transport = ConsoleTransport::new(Arc::clone(&runtime), console, UserId::new(args.user));
    info!("Type /<command>, ?<command> <option> <partial>, or a console command");

    tokio::select! {
        read = transport.run() => read?,
        run = runtime.run() => run?,
    }

    // Cancels deliveries still in flight and waits for them to unwind.
    runtime.run_until(std::future::ready(())).await?;
    Ok(())
}
