use schemars::schema_for;
use serde::Serialize;
use serde_json::Value;

use super::contract::Contract;
use super::{CommandCategory, CommandRegistry, RpcCommand};

/// A catalog entry: metadata, the positional contract, and the result schema.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRegistryEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub category: CommandCategory,
    pub usage: String,
    pub example: String,
    pub contract: Contract,
    pub result_schema: Value,
}

pub fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

pub fn schema_value<T: schemars::JsonSchema>() -> Value {
    let root = schema_for!(T);
    serde_json::to_value(root).unwrap_or_else(|_| empty_object_schema())
}

pub fn entry(command: &dyn RpcCommand) -> CommandRegistryEntry {
    let info = command.info();
    CommandRegistryEntry {
        name: info.name,
        description: info.description,
        category: info.category,
        usage: command.usage(),
        example: command.example(),
        contract: command.contract().clone(),
        result_schema: command.result_schema(),
    }
}

/// The complete catalog, in registration order.
pub fn command_catalog(registry: &CommandRegistry) -> Vec<CommandRegistryEntry> {
    registry.commands().map(|c| entry(c.as_ref())).collect()
}

/// Help text for operator tooling.
/// Three tiers: no topic → categories, category → command list, command → full help.
pub fn help_text(registry: &CommandRegistry, topic: Option<&str>) -> String {
    match topic {
        None => {
            let mut lines = vec!["Available command categories:".to_string()];
            for cat in CommandCategory::all() {
                let count = registry
                    .commands()
                    .filter(|c| c.info().category == *cat)
                    .count();
                if count > 0 {
                    lines.push(format!("  {} ({count}) - {}", cat.slug(), cat.description()));
                }
            }
            lines.push(String::new());
            lines.push("Use `help market` to list commands in a category.".to_string());
            lines.push("Use `help market_add` for full parameter details.".to_string());
            lines.join("\n")
        }
        Some(topic) => {
            if let Some(command) = registry.get(topic) {
                return format!(
                    "{}\nExample:\n    {}",
                    command.help().trim_end(),
                    command.example()
                );
            }

            let Some(cat) = CommandCategory::from_slug(topic) else {
                return format!("Unknown topic: \"{topic}\". Use `help` to see categories and commands.");
            };
            let mut lines = vec![format!("{} commands:", cat.slug())];
            for command in registry.commands().filter(|c| c.info().category == cat) {
                lines.push(format!("  - {}: {}", command.name(), command.description()));
            }
            lines.push(String::new());
            lines.push("Use `help <command>` for parameter details.".to_string());
            lines.join("\n")
        }
    }
}

impl CommandRegistry {
    pub fn catalog(&self) -> Vec<CommandRegistryEntry> {
        command_catalog(self)
    }

    pub fn help_text(&self, topic: Option<&str>) -> String {
        help_text(self, topic)
    }
}

/// JSON tool list for external help renderers.
pub fn to_json_schema(registry: &CommandRegistry) -> Value {
    Value::Array(
        command_catalog(registry)
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "description": e.description,
                    "category": e.category,
                    "usage": e.usage,
                    "example": e.example,
                    "params": e.contract.specs(),
                    "resultSchema": e.result_schema,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::registry::build_registry;
    use crate::service::Services;

    fn registry() -> CommandRegistry {
        build_registry(&Services::in_memory()).unwrap()
    }

    #[test]
    fn test_catalog_covers_every_command() {
        let registry = registry();
        let catalog = registry.catalog();
        assert_eq!(catalog.len(), registry.len());
        let add = catalog.iter().find(|e| e.name == "market_add").unwrap();
        assert_eq!(add.contract.specs().len(), 7);
        assert!(add.usage.contains("[publishAddress]"));
    }

    #[test]
    fn test_help_tiers() {
        let registry = registry();

        let top = help_text(&registry, None);
        assert!(top.contains("market (2)"));

        let cat = help_text(&registry, Some("market"));
        assert!(cat.contains("- market_add: Create a new market."));
        assert!(cat.contains("- market_list: List markets."));

        let cmd = help_text(&registry, Some("market_add"));
        assert!(cmd.starts_with("market_add <profileId>"));
        assert!(cmd.contains("Example:"));

        let unknown = help_text(&registry, Some("nope"));
        assert!(unknown.starts_with("Unknown topic"));
    }

    #[test]
    fn test_json_schema_lists_params() {
        let json = to_json_schema(&registry());
        let tools = json.as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "market_add");
        assert_eq!(tools[0]["params"][2]["enum"], "MarketType");
        assert_eq!(tools[1]["params"][0]["required"], false);
    }
}
