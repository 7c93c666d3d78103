use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use rotom_core::models::PokemonDetail;

use crate::pokeapi::PokeApiClient;

use super::helpers::{display_name, format_conditions};
use super::{SharedService, lock, run_blocking};

pub(crate) async fn cmd_show(
    service: &SharedService,
    _api: &std::sync::Arc<PokeApiClient>,
    name: &str,
    json: bool,
) -> Result<()> {
    let svc = service.clone();
    let term = name.to_string();
    let detail = run_blocking(move || lock(&svc).detail(&term)).await;

    match detail {
        Ok(detail) => print_detail(&detail, json),
        Err(err) => {
            if json {
                println!("{}", super::helpers::json_error(&format!("{err:#}")));
            } else {
                eprintln!("{err:#}");
            }
            process::exit(2);
        }
    }
}

pub(crate) fn print_detail(detail: &PokemonDetail, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(detail)?);
        return Ok(());
    }

    let favorite = if detail.favorite { " ★" } else { "" };
    println!(
        "{} (#{}){favorite}",
        display_name(&detail.name),
        detail.national_id
    );
    println!("Types: {}", detail.types.join(", "));
    if let Some(artwork) = &detail.artwork {
        println!("Artwork: {artwork}");
    }
    println!();
    print_stat_table(detail);

    if !detail.evolutions.is_empty() {
        println!();
        print_evolution_table(detail);
    }

    Ok(())
}

fn print_stat_table(detail: &PokemonDetail) {
    #[derive(Tabled)]
    struct StatRow {
        #[tabled(rename = "Stat")]
        stat: String,
        #[tabled(rename = "Base")]
        base: i64,
        #[tabled(rename = "EV yield")]
        effort: String,
    }

    let rows: Vec<StatRow> = detail
        .base_stats
        .iter()
        .map(|(stat, base)| StatRow {
            stat: stat.clone(),
            base: *base,
            effort: detail
                .effort_values
                .get(stat)
                .map_or("-".to_string(), |amount| format!("+{amount}")),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn print_evolution_table(detail: &PokemonDetail) {
    #[derive(Tabled)]
    struct EvolutionRow {
        #[tabled(rename = "Form")]
        form: String,
        #[tabled(rename = "Tier")]
        tier: i64,
        #[tabled(rename = "To evolve")]
        conditions: String,
        #[tabled(rename = "Sprite")]
        sprite: String,
    }

    let mut rows: Vec<EvolutionRow> = detail
        .evolutions
        .iter()
        .map(|(form, step)| EvolutionRow {
            form: display_name(form),
            tier: step.tier,
            conditions: step
                .conditions
                .as_ref()
                .map_or("-".to_string(), format_conditions),
            sprite: step.sprite.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    rows.sort_by_key(|row| row.tier);

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}
