use serde::Serialize;
use serde_json::Value;
use tabled::{
    Table, Tabled,
    settings::Style,
};

use rotom_core::evolution::ConditionMap;
use rotom_core::models::SpriteMap;

/// Capitalize the way the detail pages do: first letter only, rest as-is.
pub(crate) fn display_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub(crate) fn print_sprite_table(entries: &SpriteMap) {
    #[derive(Tabled)]
    struct SpriteRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Sprite")]
        sprite: String,
    }

    let rows: Vec<SpriteRow> = entries
        .iter()
        .map(|(name, sprite)| SpriteRow {
            name: display_name(name),
            sprite: sprite.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

/// Render a flattened condition map as "trigger: level-up, min_level: 16".
pub(crate) fn format_conditions(conditions: &ConditionMap) -> String {
    if conditions.is_empty() {
        return "-".to_string();
    }
    conditions
        .iter()
        .map(|(condition, need)| format!("{condition}: {}", value_display(need)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn value_display(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}
