use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;

use crate::pokeapi::PokeApiClient;
use rotom_core::models::{EffortGroups, PokemonDetail, SpriteMap, TypeSearch, validate_ev_stat};
use rotom_core::service::{DexService, Lookup};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<DexService>>,
    api: Arc<PokeApiClient>,
}

// --- Response types ---

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum LookupResponse {
    Found { pokemon: PokemonDetail },
    Ambiguous { matches: SpriteMap },
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                eprintln!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Service plumbing ---

/// Every service call is synchronous and the PokeAPI client re-enters the
/// runtime, so operations run on a blocking thread, one at a time per the
/// shared connection.
async fn run_service<T, F>(state: AppState, task: F) -> anyhow::Result<T>
where
    F: FnOnce(&DexService, &PokeApiClient) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let svc = state
            .service
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        task(&svc, state.api.as_ref())
    })
    .await
    .context("worker thread panicked")?
}

// --- Handlers ---

async fn get_pokemon(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LookupResponse>, ApiError> {
    let term = name.clone();
    let outcome = run_service(state.clone(), move |svc, api| svc.lookup(api, &term)).await?;

    match outcome {
        Lookup::Found(pokemon) => {
            let found = pokemon.name;
            let detail = run_service(state, move |svc, _| svc.detail(&found)).await?;
            Ok(Json(LookupResponse::Found { pokemon: detail }))
        }
        Lookup::Ambiguous(matches) => Ok(Json(LookupResponse::Ambiguous {
            matches: matches
                .into_iter()
                .map(|p| (p.name.clone(), p.data.sprites.front_default))
                .collect(),
        })),
        Lookup::Unknown => Err(ApiError::NotFound(format!(
            "'{name}' is not a valid Pokemon"
        ))),
    }
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let term = name.clone();
    let flagged = run_service(state, move |svc, _| svc.toggle_favorite(&term))
        .await
        .map_err(|_| ApiError::NotFound(format!("No cached entry named '{name}'")))?;
    Ok(Json(
        serde_json::json!({ "name": name.to_lowercase(), "favorite": flagged }),
    ))
}

async fn list_favorites(State(state): State<AppState>) -> Result<Json<SpriteMap>, ApiError> {
    let favorites = run_service(state, |svc, _| svc.favorites()).await?;
    Ok(Json(favorites))
}

async fn search_move(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SpriteMap>, ApiError> {
    let term = name.clone();
    let results = run_service(state, move |svc, api| svc.search_by_move(api, &term)).await?;
    results
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("'{name}' is not a valid move")))
}

async fn search_type(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TypeSearch>, ApiError> {
    let term = name.clone();
    let results = run_service(state, move |svc, api| svc.search_by_type(api, &term)).await?;
    results
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("'{name}' is not a valid type")))
}

async fn search_ev(
    State(state): State<AppState>,
    Path(stat): Path<String>,
) -> Result<Json<EffortGroups>, ApiError> {
    validate_ev_stat(&stat).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let groups = run_service(state, move |svc, _| svc.search_by_effort(&stat)).await?;
    Ok(Json(groups))
}

async fn reset_database(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let inserted = run_service(state, |svc, api| svc.reset_all(api)).await?;
    Ok(Json(serde_json::json!({ "inserted": inserted })))
}

async fn import_evolutions(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let written = run_service(state, |svc, api| svc.import_evolutions(api)).await?;
    Ok(Json(serde_json::json!({ "written": written })))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/pokemon/{name}", get(get_pokemon))
        .route("/api/pokemon/{name}/favorite", post(toggle_favorite))
        .route("/api/favorites", get(list_favorites))
        .route("/api/search/move/{name}", get(search_move))
        .route("/api/search/type/{name}", get(search_type))
        .route("/api/search/ev/{stat}", get(search_ev))
        .route("/api/admin/reset", post(reset_database))
        .route("/api/admin/evolutions", post(import_evolutions))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    service: Arc<Mutex<DexService>>,
    api: Arc<PokeApiClient>,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    let state = AppState { service, api };
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    eprintln!("Listening on http://{addr}");
    if bind != "127.0.0.1" && bind != "localhost" {
        eprintln!("Warning: listening on {bind}. Any device on your network can reach this API.");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    fn cache(svc: &DexService, value: serde_json::Value) {
        let species = serde_json::from_value(value).unwrap();
        svc.cache_species(species).unwrap();
    }

    fn seeded_state() -> AppState {
        let svc = DexService::new_in_memory().unwrap();
        cache(
            &svc,
            json!({
                "id": 1, "name": "bulbasaur",
                "stats": [{"base_stat": 49, "effort": 1, "stat": {"name": "attack"}}],
                "types": [{"type": {"name": "grass"}}, {"type": {"name": "poison"}}],
                "sprites": {"front_default": "https://sprites.example/bulbasaur.png"}
            }),
        );
        cache(&svc, json!({"id": 4, "name": "charmander"}));
        cache(&svc, json!({"id": 5, "name": "charmeleon"}));
        AppState {
            service: Arc::new(Mutex::new(svc)),
            api: Arc::new(PokeApiClient::new()),
        }
    }

    fn test_app() -> Router {
        build_router(seeded_state())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn cached_pokemon_is_served_without_network() {
        let app = test_app();

        let response = app
            .oneshot(
                axum::http::Request::get("/api/pokemon/bulbasaur")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "found");
        assert_eq!(json["pokemon"]["name"], "bulbasaur");
        assert_eq!(json["pokemon"]["national_id"], 1);
        assert_eq!(json["pokemon"]["effort_values"]["attack"], 1);
    }

    #[tokio::test]
    async fn ambiguous_name_returns_all_matches() {
        let app = test_app();

        let response = app
            .oneshot(
                axum::http::Request::get("/api/pokemon/char")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ambiguous");
        assert_eq!(json["matches"].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn favorite_toggle_and_listing() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::post("/api/pokemon/bulbasaur/favorite")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["favorite"], true);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/favorites")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json.as_object().unwrap().contains_key("bulbasaur"));
    }

    #[tokio::test]
    async fn favorite_unknown_name_is_404() {
        let app = test_app();

        let response = app
            .oneshot(
                axum::http::Request::post("/api/pokemon/missingno/favorite")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ev_search_groups_cached_records() {
        let app = test_app();

        let response = app
            .oneshot(
                axum::http::Request::get("/api/search/ev/attack")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["1"].as_object().unwrap().contains_key("bulbasaur"));
        assert!(json["2"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ev_search_rejects_shorthand_stat() {
        let app = test_app();

        let response = app
            .oneshot(
                axum::http::Request::get("/api/search/ev/spatk")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("full stat name"));
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app();

        let response = app
            .oneshot(
                axum::http::Request::get("/api/favorites")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app();

        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/admin/reset")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret db path /home/user/.rotom/db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
        assert!(!json["error"].as_str().unwrap().contains("secret"));
    }
}
