use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::NewPokemon;

/// Outcome of a remote fetch, kept distinct so callers can treat a missing
/// resource, a garbage body (PokeAPI serves an HTML error page on some
/// failures), and a transport problem differently.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("resource not found")]
    NotFound,
    #[error("malformed response from PokeAPI: {0}")]
    Malformed(String),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatEntry {
    pub base_stat: i64,
    pub effort: i64,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtworkSprite {
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: ArtworkSprite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpriteSet {
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: OtherSprites,
}

/// The species document as mirrored locally: the typed subset of the remote
/// payload that the application actually reads, validated at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesData {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub sprites: SpriteSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveData {
    #[serde(default)]
    pub learned_by_pokemon: Vec<NamedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypePokemon {
    pub pokemon: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeData {
    #[serde(default)]
    pub pokemon: Vec<TypePokemon>,
}

/// One node of the remote evolution-chain tree. `evolution_details` entries
/// are left as raw JSON maps: the condition set is open-ended and gets
/// flattened by [`crate::evolution::flatten_conditions`].
#[derive(Debug, Clone, Deserialize)]
pub struct ChainLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolution_details: Vec<serde_json::Value>,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainData {
    pub chain: ChainLink,
}

/// Effort-value yields granted for defeating this species: every stat with a
/// nonzero effort field, and nothing else.
#[must_use]
pub fn derive_effort_values(stats: &[StatEntry]) -> BTreeMap<String, i64> {
    stats
        .iter()
        .filter(|entry| entry.effort != 0)
        .map(|entry| (entry.stat.name.clone(), entry.effort))
        .collect()
}

#[must_use]
pub fn species_to_record(data: SpeciesData) -> NewPokemon {
    NewPokemon {
        name: data.name.clone(),
        effort_values: derive_effort_values(&data.stats),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(name: &str, base: i64, effort: i64) -> StatEntry {
        StatEntry {
            base_stat: base,
            effort,
            stat: NamedResource {
                name: name.to_string(),
            },
        }
    }

    #[test]
    fn test_derive_effort_values_keeps_nonzero() {
        let stats = vec![stat("hp", 45, 0), stat("attack", 49, 3)];
        let evs = derive_effort_values(&stats);
        assert_eq!(evs.len(), 1);
        assert_eq!(evs.get("attack"), Some(&3));
    }

    #[test]
    fn test_derive_effort_values_empty_when_no_yield() {
        let stats = vec![stat("hp", 45, 0), stat("speed", 45, 0)];
        assert!(derive_effort_values(&stats).is_empty());
    }

    #[test]
    fn test_derive_effort_values_multiple() {
        let stats = vec![
            stat("special-attack", 100, 1),
            stat("special-defense", 100, 2),
            stat("hp", 60, 0),
        ];
        let evs = derive_effort_values(&stats);
        assert_eq!(evs.get("special-attack"), Some(&1));
        assert_eq!(evs.get("special-defense"), Some(&2));
        assert_eq!(evs.len(), 2);
    }

    #[test]
    fn test_species_to_record() {
        let data = SpeciesData {
            id: 25,
            name: "pikachu".to_string(),
            stats: vec![stat("speed", 90, 2)],
            types: vec![TypeSlot {
                kind: NamedResource {
                    name: "electric".to_string(),
                },
            }],
            sprites: SpriteSet::default(),
        };
        let record = species_to_record(data);
        assert_eq!(record.name, "pikachu");
        assert_eq!(record.effort_values.get("speed"), Some(&2));
        assert_eq!(record.data.id, 25);
    }

    #[test]
    fn test_species_data_from_api_shape() {
        let json = r#"{
            "id": 1,
            "name": "bulbasaur",
            "stats": [
                {"base_stat": 45, "effort": 0, "stat": {"name": "hp", "url": "https://pokeapi.co/api/v2/stat/1/"}},
                {"base_stat": 65, "effort": 1, "stat": {"name": "special-attack", "url": "https://pokeapi.co/api/v2/stat/4/"}}
            ],
            "types": [
                {"slot": 1, "type": {"name": "grass", "url": "https://pokeapi.co/api/v2/type/12/"}},
                {"slot": 2, "type": {"name": "poison", "url": "https://pokeapi.co/api/v2/type/4/"}}
            ],
            "sprites": {
                "front_default": "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/1.png",
                "other": {
                    "official-artwork": {
                        "front_default": "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork/1.png"
                    }
                }
            },
            "height": 7,
            "weight": 69
        }"#;
        let data: SpeciesData = serde_json::from_str(json).unwrap();
        assert_eq!(data.id, 1);
        assert_eq!(data.name, "bulbasaur");
        assert_eq!(data.types.len(), 2);
        assert_eq!(data.types[0].kind.name, "grass");
        assert!(
            data.sprites
                .other
                .official_artwork
                .front_default
                .as_deref()
                .unwrap()
                .contains("official-artwork")
        );
        assert_eq!(derive_effort_values(&data.stats).get("special-attack"), Some(&1));
    }

    #[test]
    fn test_species_data_tolerates_missing_sprites() {
        let data: SpeciesData =
            serde_json::from_str(r#"{"id": 132, "name": "ditto"}"#).unwrap();
        assert!(data.sprites.front_default.is_none());
        assert!(data.sprites.other.official_artwork.front_default.is_none());
        assert!(data.stats.is_empty());
    }

    #[test]
    fn test_malformed_body_fails_to_parse() {
        assert!(serde_json::from_str::<SpeciesData>("<html>Not Found</html>").is_err());
        assert!(serde_json::from_str::<SpeciesData>(r#"{"name": "missing-id"}"#).is_err());
    }
}
