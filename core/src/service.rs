use std::path::Path;

use anyhow::{Context, Result};

use crate::db::Database;
use crate::evolution;
use crate::models::{
    EffortGroups, EvolutionStep, NewEvolution, Pokemon, PokemonDetail, SpriteMap, TypeSearch,
    normalize_name, validate_ev_stat,
};
use crate::pokeapi::{ChainData, FetchError, MoveData, SpeciesData, TypeData, species_to_record};

/// Remote data source seam.
///
/// The CLI implements this with reqwest; tests use an in-memory mock. Called
/// synchronously — async callers should hop to a blocking thread first.
pub trait SpeciesProvider: Send + Sync {
    fn fetch_pokemon(&self, name_or_id: &str) -> Result<SpeciesData, FetchError>;
    fn fetch_move(&self, name: &str) -> Result<MoveData, FetchError>;
    fn fetch_type(&self, name: &str) -> Result<TypeData, FetchError>;
    fn fetch_evolution_chain(&self, id: u32) -> Result<ChainData, FetchError>;
}

/// Outcome of resolving a free-text species name against the cache.
#[derive(Debug)]
pub enum Lookup {
    /// Exactly one cached match, or a fresh fetch that is now cached.
    Found(Pokemon),
    /// Several cached records match the term; the caller presents them all.
    Ambiguous(Vec<Pokemon>),
    /// Nothing cached and the remote had nothing usable either.
    Unknown,
}

pub struct DexService {
    db: Database,
}

impl DexService {
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            db: Database::open(db_path)?,
        })
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
        })
    }

    /// Validate a fetched species document and insert it into the mirror,
    /// deriving its effort-value yields once.
    pub fn cache_species(&self, species: SpeciesData) -> Result<Pokemon> {
        self.db.insert_pokemon(&species_to_record(species))
    }

    // --- Fetch-or-cache resolver ---

    /// Resolve a species name: cache first, remote on a true miss.
    ///
    /// A single cached substring match answers without any network call. A
    /// remote 404 or a body that does not parse as a species document both
    /// come back as [`Lookup::Unknown`]; only transport failures surface as
    /// errors.
    pub fn lookup(&self, provider: &dyn SpeciesProvider, term: &str) -> Result<Lookup> {
        let needle = normalize_name(term);
        let mut matches = self.db.search_pokemon(&needle)?;
        match matches.len() {
            1 => Ok(Lookup::Found(matches.remove(0))),
            0 => match provider.fetch_pokemon(&needle) {
                Ok(data) => Ok(Lookup::Found(self.cache_species(data)?)),
                Err(FetchError::NotFound | FetchError::Malformed(_)) => Ok(Lookup::Unknown),
                Err(err) => Err(err.into()),
            },
            _ => Ok(Lookup::Ambiguous(matches)),
        }
    }

    // --- Searches ---

    /// Species that learn the given move, as name -> front sprite, or `None`
    /// when the move does not exist. Names that resolve ambiguously or not
    /// at all are skipped.
    pub fn search_by_move(
        &self,
        provider: &dyn SpeciesProvider,
        term: &str,
    ) -> Result<Option<SpriteMap>> {
        let move_name = normalize_name(term);
        let move_data = match provider.fetch_move(&move_name) {
            Ok(data) => data,
            Err(FetchError::NotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let mut results = SpriteMap::new();
        for learner in &move_data.learned_by_pokemon {
            if let Lookup::Found(pokemon) = self.lookup(provider, &learner.name)? {
                results.insert(
                    pokemon.name.clone(),
                    pokemon.data.sprites.front_default.clone(),
                );
            }
        }
        Ok(Some(results))
    }

    /// Species of the given type, split into mono-type and dual-type groups
    /// by the cached record's type list, or `None` when the type does not
    /// exist.
    pub fn search_by_type(
        &self,
        provider: &dyn SpeciesProvider,
        term: &str,
    ) -> Result<Option<TypeSearch>> {
        let type_name = normalize_name(term);
        let type_data = match provider.fetch_type(&type_name) {
            Ok(data) => data,
            Err(FetchError::NotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let mut results = TypeSearch {
            mono: SpriteMap::new(),
            dual: SpriteMap::new(),
        };
        for entry in &type_data.pokemon {
            if let Lookup::Found(pokemon) = self.lookup(provider, &entry.pokemon.name)? {
                let sprite = pokemon.data.sprites.front_default.clone();
                if pokemon.data.types.len() == 1 {
                    results.mono.insert(pokemon.name.clone(), sprite);
                } else {
                    results.dual.insert(pokemon.name.clone(), sprite);
                }
            }
        }
        Ok(Some(results))
    }

    /// Cache-only search by effort-value yield, grouped by amount. The stat
    /// must be spelled out in full; groups 1-3 are always present.
    pub fn search_by_effort(&self, term: &str) -> Result<EffortGroups> {
        let stat = validate_ev_stat(term)?;
        let candidates = self.db.search_by_effort(&stat)?;

        let mut grouped: EffortGroups = (1..=3).map(|amount| (amount, SpriteMap::new())).collect();
        for pokemon in candidates {
            // The DB query is a substring prefilter; only records whose
            // derived map holds this exact stat belong in the results.
            if let Some(&amount) = pokemon.effort_values.get(&stat) {
                grouped
                    .entry(amount)
                    .or_default()
                    .insert(pokemon.name.clone(), pokemon.data.sprites.front_default.clone());
            }
        }
        Ok(grouped)
    }

    // --- Favorites ---

    pub fn toggle_favorite(&self, name: &str) -> Result<bool> {
        self.db.toggle_favorite(&normalize_name(name))
    }

    pub fn favorites(&self) -> Result<SpriteMap> {
        let mut results = SpriteMap::new();
        for pokemon in self.db.favorites()? {
            results.insert(
                pokemon.name.clone(),
                pokemon.data.sprites.front_default.clone(),
            );
        }
        Ok(results)
    }

    // --- Detail view ---

    /// Full card for the first cached match of a name, with the evolution
    /// display when this species participates in an imported chain.
    pub fn detail(&self, name: &str) -> Result<PokemonDetail> {
        let needle = normalize_name(name);
        let record = self
            .db
            .first_match(&needle)?
            .with_context(|| format!("No cached entry matches '{name}'"))?;

        let data = &record.data;
        let mut detail = PokemonDetail {
            name: data.name.clone(),
            national_id: data.id,
            types: data.types.iter().map(|slot| slot.kind.name.clone()).collect(),
            artwork: data.sprites.other.official_artwork.front_default.clone(),
            base_stats: data
                .stats
                .iter()
                .map(|entry| (entry.stat.name.clone(), entry.base_stat))
                .collect(),
            effort_values: record.effort_values.clone(),
            favorite: record.favorite,
            evolutions: std::collections::BTreeMap::new(),
        };

        if let Some(evolution) = self.db.evolution_for_species(&data.name)? {
            for (species, next_forms) in &evolution.chain {
                if next_forms.is_empty() {
                    continue;
                }
                if !detail.evolutions.contains_key(species) {
                    detail
                        .evolutions
                        .insert(species.clone(), self.evolution_step(species)?);
                }
                for (next, conditions) in next_forms {
                    if !detail.evolutions.contains_key(next) {
                        detail
                            .evolutions
                            .insert(next.clone(), self.evolution_step(next)?);
                    }
                    if let Some(step) = detail.evolutions.get_mut(next) {
                        step.conditions = Some(conditions.clone());
                    }
                }
            }
        }

        Ok(detail)
    }

    fn evolution_step(&self, species: &str) -> Result<EvolutionStep> {
        let partner = self
            .db
            .get_pokemon_by_name(species)
            .with_context(|| format!("evolution partner '{species}' is not cached"))?;
        let tier = self
            .db
            .evolution_for_species(species)?
            .with_context(|| format!("no evolution record for '{species}'"))?
            .tier;
        Ok(EvolutionStep {
            sprite: partner.data.sprites.front_default.clone(),
            tier,
            conditions: None,
        })
    }

    // --- Bulk sweeps ---

    /// Wipe the mirror and repopulate it by walking national-dex IDs upward.
    /// The numbering gaps once before 10001; the first miss jumps it, the
    /// second ends the sweep. Returns how many species were inserted.
    pub fn reset_all(&self, provider: &dyn SpeciesProvider) -> Result<usize> {
        self.db.delete_all_pokemon()?;

        let mut inserted = 0;
        let mut species_id: u32 = 1;
        let mut jumped = false;
        loop {
            match provider.fetch_pokemon(&species_id.to_string()) {
                Ok(data) => {
                    self.cache_species(data)?;
                    inserted += 1;
                    species_id += 1;
                }
                Err(FetchError::NotFound) if !jumped && species_id < 10_001 => {
                    jumped = true;
                    species_id = 10_001;
                }
                Err(FetchError::NotFound) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(inserted)
    }

    /// Import every evolution chain the remote knows (IDs 1..500, the gaps
    /// 404 and are skipped). A chain is skipped wholesale when its base form
    /// already has a record or when it has no evolutions at all; otherwise
    /// one record per species is written, each carrying the complete flat
    /// chain. Returns how many records were written.
    pub fn import_evolutions(&self, provider: &dyn SpeciesProvider) -> Result<usize> {
        let mut written = 0;
        for chain_id in 1..500 {
            let chain_data = match provider.fetch_evolution_chain(chain_id) {
                Ok(data) => data,
                Err(FetchError::NotFound) => continue,
                Err(err) => return Err(err.into()),
            };

            let root = &chain_data.chain;
            if root.evolves_to.is_empty() {
                continue;
            }
            if self.db.has_chain_for_base(&root.species.name)? {
                continue;
            }

            let normalized = evolution::normalize_chain(root);
            for (species, tier) in &normalized.tiers {
                let owner = self
                    .db
                    .first_match(species)?
                    .with_context(|| format!("species '{species}' is not cached; reset the database first"))?;
                self.db.insert_evolution(&NewEvolution {
                    species_name: species.clone(),
                    pokemon_id: owner.id,
                    chain: normalized.links.clone(),
                    tier: *tier,
                })?;
                written += 1;
            }
        }
        Ok(written)
    }
}
