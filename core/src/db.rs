use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::types::Type;
use rusqlite::{Connection, params};

use crate::evolution::ChainMap;
use crate::models::{Evolution, NewEvolution, NewPokemon, Pokemon};
use crate::pokeapi::SpeciesData;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Cascade delete from pokemon to evolutions requires per-connection
        // foreign-key enforcement.
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS pokemon (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    data TEXT NOT NULL,
                    favorite INTEGER NOT NULL DEFAULT 0,
                    effort_values TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS evolutions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    species_name TEXT NOT NULL,
                    pokemon_id INTEGER NOT NULL REFERENCES pokemon(id) ON DELETE CASCADE,
                    chain TEXT NOT NULL,
                    tier INTEGER NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_pokemon_name ON pokemon(name);
                CREATE INDEX IF NOT EXISTS idx_evolutions_species ON evolutions(species_name);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn pokemon_from_row(row: &rusqlite::Row) -> rusqlite::Result<Pokemon> {
        let data_json: String = row.get(2)?;
        let evs_json: String = row.get(4)?;
        let data: SpeciesData = serde_json::from_str(&data_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
        let effort_values: BTreeMap<String, i64> = serde_json::from_str(&evs_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
        Ok(Pokemon {
            id: row.get(0)?,
            name: row.get(1)?,
            data,
            favorite: row.get(3)?,
            effort_values,
            created_at: row.get(5)?,
        })
    }

    fn evolution_from_row(row: &rusqlite::Row) -> rusqlite::Result<Evolution> {
        let chain_json: String = row.get(3)?;
        let chain: ChainMap = serde_json::from_str(&chain_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        Ok(Evolution {
            id: row.get(0)?,
            species_name: row.get(1)?,
            pokemon_id: row.get(2)?,
            chain,
            tier: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn like_pattern(needle: &str) -> String {
        let escaped = needle
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{escaped}%")
    }

    // --- Pokemon ---

    pub fn insert_pokemon(&self, pokemon: &NewPokemon) -> Result<Pokemon> {
        let now = Local::now().to_rfc3339();
        let data = serde_json::to_string(&pokemon.data)?;
        let effort_values = serde_json::to_string(&pokemon.effort_values)?;
        self.conn.execute(
            "INSERT INTO pokemon (name, data, favorite, effort_values, created_at)
             VALUES (?1, ?2, 0, ?3, ?4)",
            params![pokemon.name, data, effort_values, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_pokemon_by_id(id)
    }

    pub fn get_pokemon_by_id(&self, id: i64) -> Result<Pokemon> {
        self.conn
            .query_row(
                "SELECT * FROM pokemon WHERE id = ?1",
                params![id],
                Self::pokemon_from_row,
            )
            .context("Pokemon not found")
    }

    /// Exact-name lookup. Duplicate names are tolerated in the table; the
    /// oldest record wins.
    pub fn get_pokemon_by_name(&self, name: &str) -> Result<Pokemon> {
        self.conn
            .query_row(
                "SELECT * FROM pokemon WHERE name = ?1 ORDER BY id LIMIT 1",
                params![name],
                Self::pokemon_from_row,
            )
            .with_context(|| format!("No cached entry named '{name}'"))
    }

    /// Substring search over names. Several records can match one term
    /// ("char" matches the whole Charmander line); callers present every
    /// match rather than assuming a unique hit.
    pub fn search_pokemon(&self, needle: &str) -> Result<Vec<Pokemon>> {
        let pattern = Self::like_pattern(needle);
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM pokemon WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id")?;
        let matches = stmt
            .query_map(params![pattern], Self::pokemon_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    pub fn first_match(&self, needle: &str) -> Result<Option<Pokemon>> {
        let pattern = Self::like_pattern(needle);
        let mut stmt = self.conn.prepare(
            "SELECT * FROM pokemon WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id LIMIT 1",
        )?;
        let mut rows = stmt.query(params![pattern])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::pokemon_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Flip the favorite flag on an exact name and return the new state.
    pub fn toggle_favorite(&self, name: &str) -> Result<bool> {
        let pokemon = self.get_pokemon_by_name(name)?;
        let flagged = !pokemon.favorite;
        self.conn.execute(
            "UPDATE pokemon SET favorite = ?1 WHERE id = ?2",
            params![flagged, pokemon.id],
        )?;
        Ok(flagged)
    }

    pub fn favorites(&self) -> Result<Vec<Pokemon>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM pokemon WHERE favorite = 1 ORDER BY name")?;
        let favorites = stmt
            .query_map([], Self::pokemon_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    /// Candidate records for an effort-value search. This is only a LIKE
    /// prefilter over the stored JSON; the caller checks the parsed map for
    /// the exact stat key ("attack" also matches "special-attack" here).
    pub fn search_by_effort(&self, stat: &str) -> Result<Vec<Pokemon>> {
        let pattern = Self::like_pattern(stat);
        let mut stmt = self.conn.prepare(
            "SELECT * FROM pokemon WHERE effort_values LIKE ?1 ESCAPE '\\' ORDER BY id",
        )?;
        let matches = stmt
            .query_map(params![pattern], Self::pokemon_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    /// Wipe the whole mirror. Evolution records go with their owners through
    /// the cascade.
    pub fn delete_all_pokemon(&self) -> Result<usize> {
        let rows = self.conn.execute("DELETE FROM pokemon", [])?;
        Ok(rows)
    }

    pub fn count_pokemon(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM pokemon", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Evolutions ---

    pub fn insert_evolution(&self, evolution: &NewEvolution) -> Result<Evolution> {
        let now = Local::now().to_rfc3339();
        let chain = serde_json::to_string(&evolution.chain)?;
        self.conn.execute(
            "INSERT INTO evolutions (species_name, pokemon_id, chain, tier, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                evolution.species_name,
                evolution.pokemon_id,
                chain,
                evolution.tier,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn
            .query_row(
                "SELECT * FROM evolutions WHERE id = ?1",
                params![id],
                Self::evolution_from_row,
            )
            .context("Evolution record not found after insert")
    }

    pub fn evolution_for_species(&self, needle: &str) -> Result<Option<Evolution>> {
        let pattern = Self::like_pattern(needle);
        let mut stmt = self.conn.prepare(
            "SELECT * FROM evolutions WHERE species_name LIKE ?1 ESCAPE '\\' ORDER BY id LIMIT 1",
        )?;
        let mut rows = stmt.query(params![pattern])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::evolution_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Whether the chain whose base form has this exact name was already
    /// imported. Import skips the whole chain when it was.
    pub fn has_chain_for_base(&self, base_species: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM evolutions WHERE species_name = ?1)",
            params![base_species],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}
