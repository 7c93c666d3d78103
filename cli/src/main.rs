mod commands;
mod config;
mod pokeapi;
mod server;

use std::process;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{
    cmd_ev_search, cmd_fave, cmd_faves, cmd_move_search, cmd_pull_evolutions, cmd_reset,
    cmd_search, cmd_show, cmd_type_search,
};
use crate::config::Config;
use crate::pokeapi::PokeApiClient;
use rotom_core::service::DexService;

#[derive(Parser)]
#[command(
    name = "rotom",
    version,
    about = "A local-first Pokédex cache CLI",
    long_about = "\n\n            _
   _ __ ___ | |_ ___  _ __ ___
  | '__/ _ \\| __/ _ \\| '_ ` _ \\
  | | | (_) | || (_) | | | | | |
  |_|  \\___/ \\__\\___/|_| |_| |_|
      your pocket Pokédex mirror.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a Pokémon by name, fetching and caching it on a miss
    Search {
        /// Pokémon name (partial names list every match)
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every Pokémon that can learn a move
    Move {
        /// Move name (e.g. "thunderbolt", "ice beam")
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every Pokémon of a type, split into mono- and dual-type
    Type {
        /// Type name (e.g. "fire")
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List cached Pokémon by the effort values they yield
    Ev {
        /// Full stat name (e.g. "attack", "special defense")
        stat: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the full card for a cached Pokémon
    Show {
        /// Pokémon name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a Pokémon's favorite flag
    Fave {
        /// Pokémon name (exact)
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List favorite Pokémon
    Faves {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Wipe the mirror and re-import every species from PokeAPI
    Reset {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import every evolution chain from PokeAPI
    Evolutions {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let service = Arc::new(Mutex::new(DexService::open(&config.db_path)?));
    let api = Arc::new(PokeApiClient::new());

    match cli.command {
        Commands::Search { name, json } => cmd_search(&service, &api, &name, json).await,
        Commands::Move { name, json } => cmd_move_search(&service, &api, &name, json).await,
        Commands::Type { name, json } => cmd_type_search(&service, &api, &name, json).await,
        Commands::Ev { stat, json } => cmd_ev_search(&service, &stat, json).await,
        Commands::Show { name, json } => cmd_show(&service, &api, &name, json).await,
        Commands::Fave { name, json } => cmd_fave(&service, &name, json).await,
        Commands::Faves { json } => cmd_faves(&service, json).await,
        Commands::Reset { json } => cmd_reset(&service, &api, json).await,
        Commands::Evolutions { json } => cmd_pull_evolutions(&service, &api, json).await,
        Commands::Serve { port, bind } => server::start_server(service, api, port, &bind).await,
    }
}
