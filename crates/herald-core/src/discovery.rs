//! Link-time command discovery.
//!
//! Command modules contribute a constructor to the [`COMMANDS`] distributed
//! slice; the runtime collects them at startup and on every command reload.
//! Nothing needs to list the modules by hand.
//!
//! ```rust,ignore
//! use herald_core::{declare_command, Command, CommandContext};
//!
//! fn ping() -> Command {
//!     Command::new("ping", |ctx: CommandContext| async move { /* ... */ })
//! }
//!
//! declare_command!(PING => ping);
//! ```

use linkme::distributed_slice;

use crate::command::Command;

/// Constructor of one discoverable command.
pub type CommandCtor = fn() -> Command;

/// Every command constructor linked into the binary.
#[distributed_slice]
pub static COMMANDS: [CommandCtor];

/// Builds a fresh instance of every discovered command.
///
/// Order follows the linker and is not meaningful; duplicates are left for
/// the registry to reject.
pub fn discovered_commands() -> Vec<Command> {
    COMMANDS.iter().map(|ctor| ctor()).collect()
}

/// Adds a command constructor to [`COMMANDS`].
#[macro_export]
macro_rules! declare_command {
    ($static_name:ident => $ctor:path) => {
        #[$crate::linkme::distributed_slice($crate::discovery::COMMANDS)]
        #[linkme(crate = $crate::linkme)]
        static $static_name: $crate::discovery::CommandCtor = $ctor;
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandContext;

    fn discovered_echo() -> Command {
        Command::new("discovered-echo", |_ctx: CommandContext| async {})
    }

    declare_command!(DISCOVERED_ECHO => discovered_echo);

    #[test]
    fn declared_commands_are_collected() {
        let names: Vec<String> = discovered_commands()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert!(names.iter().any(|n| n == "discovered-echo"));
    }
}
