use std::process;

use anyhow::Result;

use super::helpers::{display_name, print_sprite_table};
use super::{SharedService, lock, run_blocking};

pub(crate) async fn cmd_fave(service: &SharedService, name: &str, json: bool) -> Result<()> {
    let svc = service.clone();
    let term = name.to_string();
    let flagged = run_blocking(move || lock(&svc).toggle_favorite(&term)).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "name": name.to_lowercase(), "favorite": flagged })
        );
    } else if flagged {
        println!("Marked {} as a favorite", display_name(name));
    } else {
        println!("Removed {} from favorites", display_name(name));
    }
    Ok(())
}

pub(crate) async fn cmd_faves(service: &SharedService, json: bool) -> Result<()> {
    let svc = service.clone();
    let favorites = run_blocking(move || lock(&svc).favorites()).await?;

    if favorites.is_empty() {
        if json {
            println!("{{}}");
        } else {
            eprintln!("No favorites yet");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&favorites)?);
    } else {
        print_sprite_table(&favorites);
    }
    Ok(())
}
