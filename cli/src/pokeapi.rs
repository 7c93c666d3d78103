use serde::de::DeserializeOwned;

use rotom_core::pokeapi::{ChainData, FetchError, MoveData, SpeciesData, TypeData};
use rotom_core::service::SpeciesProvider;

const BASE_URL: &str = "https://pokeapi.co/api/v2";

pub struct PokeApiClient {
    client: reqwest::Client,
    rt: tokio::runtime::Handle,
}

impl PokeApiClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "rotom-cli/{} (Pokédex cache)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            rt: tokio::runtime::Handle::current(),
        }
    }

    /// One GET against the API. A 404 is `NotFound`; any 200 body that does
    /// not parse into the expected shape (PokeAPI can answer with an HTML
    /// error page) is `Malformed` rather than a transport error.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{BASE_URL}/{path}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    pub async fn fetch_pokemon_async(&self, name_or_id: &str) -> Result<SpeciesData, FetchError> {
        self.get_json(&format!("pokemon/{name_or_id}")).await
    }

    pub async fn fetch_move_async(&self, name: &str) -> Result<MoveData, FetchError> {
        self.get_json(&format!("move/{name}")).await
    }

    pub async fn fetch_type_async(&self, name: &str) -> Result<TypeData, FetchError> {
        self.get_json(&format!("type/{name}")).await
    }

    pub async fn fetch_evolution_chain_async(&self, id: u32) -> Result<ChainData, FetchError> {
        self.get_json(&format!("evolution-chain/{id}")).await
    }
}

impl SpeciesProvider for PokeApiClient {
    fn fetch_pokemon(&self, name_or_id: &str) -> Result<SpeciesData, FetchError> {
        self.rt.block_on(self.fetch_pokemon_async(name_or_id))
    }

    fn fetch_move(&self, name: &str) -> Result<MoveData, FetchError> {
        self.rt.block_on(self.fetch_move_async(name))
    }

    fn fetch_type(&self, name: &str) -> Result<TypeData, FetchError> {
        self.rt.block_on(self.fetch_type_async(name))
    }

    fn fetch_evolution_chain(&self, id: u32) -> Result<ChainData, FetchError> {
        self.rt.block_on(self.fetch_evolution_chain_async(id))
    }
}
