use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::evolution::{ChainMap, ConditionMap};
use crate::pokeapi::SpeciesData;

/// One cached species. Names are lower-cased but not unique: lookups are
/// substring matches and several records may match one search term, so
/// callers go through [`crate::service::Lookup`] rather than exact keys.
#[derive(Debug, Clone, Serialize)]
pub struct Pokemon {
    pub id: i64,
    pub name: String,
    pub data: SpeciesData,
    pub favorite: bool,
    pub effort_values: BTreeMap<String, i64>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPokemon {
    pub name: String,
    pub data: SpeciesData,
    pub effort_values: BTreeMap<String, i64>,
}

/// One species' membership in an evolution chain. Every record of a chain
/// carries the complete flat chain map; the per-record field is the tier.
#[derive(Debug, Clone, Serialize)]
pub struct Evolution {
    pub id: i64,
    pub species_name: String,
    pub pokemon_id: i64,
    pub chain: ChainMap,
    pub tier: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewEvolution {
    pub species_name: String,
    pub pokemon_id: i64,
    pub chain: ChainMap,
    pub tier: i64,
}

/// Search results map species name to its front sprite URL (which the remote
/// data may leave null).
pub type SpriteMap = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Serialize)]
pub struct TypeSearch {
    pub mono: SpriteMap,
    pub dual: SpriteMap,
}

/// Effort search results grouped by yield amount; groups 1-3 are always
/// present even when empty.
pub type EffortGroups = BTreeMap<i64, SpriteMap>;

#[derive(Debug, Clone, Serialize)]
pub struct PokemonDetail {
    pub name: String,
    pub national_id: i64,
    pub types: Vec<String>,
    pub artwork: Option<String>,
    pub base_stats: BTreeMap<String, i64>,
    pub effort_values: BTreeMap<String, i64>,
    pub favorite: bool,
    pub evolutions: BTreeMap<String, EvolutionStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvolutionStep {
    pub sprite: Option<String>,
    pub tier: i64,
    /// Conditions to evolve *into* this form; absent on base forms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<ConditionMap>,
}

pub const PLAIN_EV_STATS: &[&str] = &["attack", "defense", "hp", "speed"];
pub const SPECIAL_EV_STATS: &[&str] = &["special-attack", "special-defense"];

/// Lower-case a search term and swap spaces for hyphens, the form PokeAPI
/// expects in URLs ("Mr Mime" -> "mr-mime").
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "-")
}

pub fn validate_ev_stat(stat: &str) -> Result<String> {
    let normalized = normalize_name(stat);
    if PLAIN_EV_STATS.contains(&normalized.as_str())
        || SPECIAL_EV_STATS.contains(&normalized.as_str())
    {
        Ok(normalized)
    } else {
        bail!(
            "Unknown stat '{stat}'. Use the full stat name: hp, attack, defense, speed, special attack, special defense"
        )
    }
}
