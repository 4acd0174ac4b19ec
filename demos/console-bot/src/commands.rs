//! Slash commands of the console bot.
//!
//! Both commands are picked up through `declare_command!`; `reload` comes
//! built into the runtime.

use std::collections::BTreeMap;

use herald::prelude::*;
use serde::Deserialize;

// ============================================================================
// ping
// ============================================================================

fn ping() -> Command {
    Command::new("ping", |ctx: CommandContext| async move {
        ctx.respond(Reply::success(format!("Hello, {}!", ctx.user())).with_title("Pong!"))
            .await
    })
    .description("Replies with Pong!")
    .global_cooldown(Duration::from_secs(5))
}

declare_command!(PING => ping);

// ============================================================================
// info
// ============================================================================

/// One staff-written info message.
#[derive(Debug, Clone, Deserialize)]
struct InfoEmbed {
    title: Option<String>,
    #[serde(default)]
    description: String,
}

/// Info messages keyed by a comma-separated alias list, e.g. `"rules, r"`.
type InfoEmbeds = BTreeMap<String, InfoEmbed>;

fn info_embeds(config: &CommandConfig) -> InfoEmbeds {
    config.option("info_embeds").unwrap_or_default()
}

fn aliases(key: &str) -> impl Iterator<Item = &str> {
    key.split(',').map(str::trim).filter(|a| !a.is_empty())
}

/// Finds the message whose alias list contains `name`, ignoring case.
fn find_info<'a>(infos: &'a InfoEmbeds, name: &str) -> Option<&'a InfoEmbed> {
    infos
        .iter()
        .find(|(key, _)| aliases(key).any(|alias| alias.eq_ignore_ascii_case(name)))
        .map(|(_, info)| info)
}

fn list_reply(infos: &InfoEmbeds) -> Reply {
    let names: Vec<String> = infos
        .keys()
        .filter_map(|key| aliases(key).next())
        .map(|name| format!("`{name}`"))
        .collect();
    Reply::info(names.join(", ")).with_title("Info messages")
}

async fn run_info(ctx: CommandContext) -> HandlerResult {
    let infos = info_embeds(&ctx.config);
    let reply = match ctx.string_option("name") {
        _ if infos.is_empty() => Reply::error("This server has no info messages."),
        Some(name) if name.eq_ignore_ascii_case("list") => list_reply(&infos),
        Some(name) => match find_info(&infos, name) {
            Some(info) => {
                let reply = Reply::info(info.description.clone());
                match &info.title {
                    Some(title) => reply.with_title(title.clone()),
                    None => reply,
                }
            }
            None => Reply::error("That info message does not exist."),
        },
        None => return Err("missing required option `name`".into()),
    };
    ctx.respond(reply).await?;
    Ok(())
}

async fn complete_info(ctx: AutocompleteContext) -> Vec<Choice> {
    let infos = info_embeds(&ctx.config);
    infos
        .keys()
        .flat_map(|key| aliases(key))
        .chain(std::iter::once("list"))
        .filter(|name| name.starts_with(ctx.focused.value.as_str()))
        .map(Choice::string)
        .collect()
}

fn info() -> Command {
    Command::new("info", run_info)
        .description("Gets staff-written info messages.")
        .option(
            CommandOption::new("name", OptionKind::String)
                .description("The name of the info message.")
                .required(true),
        )
        .autocomplete("name", complete_info)
        .per_user_cooldown(Duration::from_secs(2))
}

declare_command!(INFO => info);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> CommandConfig {
        CommandConfig::new().with_option(
            "info_embeds",
            json!({
                "rules, r": { "title": "Rules", "description": "Be nice." },
                "faq": { "description": "Read the pins." }
            }),
        )
    }

    #[test]
    fn lookup_matches_any_alias() {
        let infos = info_embeds(&config());
        assert_eq!(find_info(&infos, "R").map(|i| i.description.as_str()), Some("Be nice."));
        assert!(find_info(&infos, "faq").is_some());
        assert!(find_info(&infos, "missing").is_none());
    }

    #[test]
    fn list_uses_first_alias() {
        let reply = list_reply(&info_embeds(&config()));
        assert_eq!(reply.description, "`faq`, `rules`");
    }

    #[test]
    fn info_declares_autocomplete() {
        let command = info();
        assert!(command.options()[0].autocomplete);
        assert!(command.autocomplete_for("name").is_some());
    }
}
