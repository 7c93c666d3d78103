use std::process;
use std::sync::Arc;

use anyhow::Result;

use rotom_core::models::SpriteMap;
use rotom_core::service::Lookup;

use crate::pokeapi::PokeApiClient;

use super::helpers::{display_name, json_error, print_sprite_table};
use super::show::print_detail;
use super::{SharedService, lock, run_blocking};

pub(crate) async fn cmd_search(
    service: &SharedService,
    api: &Arc<PokeApiClient>,
    name: &str,
    json: bool,
) -> Result<()> {
    let svc = service.clone();
    let client = api.clone();
    let term = name.to_string();
    let outcome = run_blocking(move || lock(&svc).lookup(client.as_ref(), &term)).await?;

    match outcome {
        Lookup::Found(pokemon) => {
            let svc = service.clone();
            let found = pokemon.name.clone();
            let detail = run_blocking(move || lock(&svc).detail(&found)).await?;
            print_detail(&detail, json)
        }
        Lookup::Ambiguous(matches) => {
            let entries: SpriteMap = matches
                .into_iter()
                .map(|p| (p.name.clone(), p.data.sprites.front_default))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                eprintln!("'{name}' matches several Pokémon:");
                print_sprite_table(&entries);
            }
            Ok(())
        }
        Lookup::Unknown => {
            if json {
                println!("{}", json_error(&format!("'{name}' is not a valid Pokemon")));
            } else {
                eprintln!("'{name}' is not a valid Pokémon");
            }
            process::exit(2);
        }
    }
}

pub(crate) async fn cmd_move_search(
    service: &SharedService,
    api: &Arc<PokeApiClient>,
    name: &str,
    json: bool,
) -> Result<()> {
    let svc = service.clone();
    let client = api.clone();
    let term = name.to_string();
    let results = run_blocking(move || lock(&svc).search_by_move(client.as_ref(), &term)).await?;

    let Some(results) = results else {
        if json {
            println!("{}", json_error(&format!("'{name}' is not a valid move")));
        } else {
            eprintln!("'{name}' is not a valid move");
        }
        process::exit(2);
    };

    if results.is_empty() {
        if json {
            println!("{{}}");
        } else {
            eprintln!("No Pokémon learn '{name}'");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("Pokémon that learn {}:", display_name(name));
        print_sprite_table(&results);
    }
    Ok(())
}

pub(crate) async fn cmd_type_search(
    service: &SharedService,
    api: &Arc<PokeApiClient>,
    name: &str,
    json: bool,
) -> Result<()> {
    let svc = service.clone();
    let client = api.clone();
    let term = name.to_string();
    let results = run_blocking(move || lock(&svc).search_by_type(client.as_ref(), &term)).await?;

    let Some(results) = results else {
        if json {
            println!("{}", json_error(&format!("'{name}' is not a valid type")));
        } else {
            eprintln!("'{name}' is not a valid type");
        }
        process::exit(2);
    };

    if results.mono.is_empty() && results.dual.is_empty() {
        if json {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            eprintln!("No Pokémon of type '{name}'");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        if !results.mono.is_empty() {
            println!("Mono-type {}:", display_name(name));
            print_sprite_table(&results.mono);
        }
        if !results.dual.is_empty() {
            println!("Dual-type {}:", display_name(name));
            print_sprite_table(&results.dual);
        }
    }
    Ok(())
}

pub(crate) async fn cmd_ev_search(service: &SharedService, stat: &str, json: bool) -> Result<()> {
    let svc = service.clone();
    let term = stat.to_string();
    let groups = run_blocking(move || lock(&svc).search_by_effort(&term)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.values().all(SpriteMap::is_empty) {
        eprintln!("No cached Pokémon yield {stat} EVs");
        process::exit(2);
    }

    for (amount, entries) in &groups {
        if entries.is_empty() {
            continue;
        }
        println!("{} +{amount}:", display_name(stat));
        print_sprite_table(entries);
    }
    Ok(())
}
