use std::sync::Arc;

use anyhow::Result;

use crate::pokeapi::PokeApiClient;

use super::{SharedService, lock, run_blocking};

pub(crate) async fn cmd_reset(
    service: &SharedService,
    api: &Arc<PokeApiClient>,
    json: bool,
) -> Result<()> {
    eprintln!("Wiping the mirror and refetching every species; this walks the whole national dex and takes a while.");

    let svc = service.clone();
    let client = api.clone();
    let inserted = run_blocking(move || lock(&svc).reset_all(client.as_ref())).await?;

    if json {
        println!("{}", serde_json::json!({ "inserted": inserted }));
    } else {
        println!("Database reset: {inserted} Pokémon imported.");
    }
    Ok(())
}

pub(crate) async fn cmd_pull_evolutions(
    service: &SharedService,
    api: &Arc<PokeApiClient>,
    json: bool,
) -> Result<()> {
    eprintln!("Importing evolution chains; this fetches several hundred chain documents.");

    let svc = service.clone();
    let client = api.clone();
    let written = run_blocking(move || lock(&svc).import_evolutions(client.as_ref())).await?;

    if json {
        println!("{}", serde_json::json!({ "written": written }));
    } else {
        println!("Imported {written} evolution records.");
    }
    Ok(())
}
