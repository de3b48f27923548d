//! Query server for location resolution.
//!
//! Provides an HTTP API over the resolution engine: batch and single-location
//! geocoding plus "did you mean" suggestions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use compass::store::PostgrestStore;
use compass::{Config, GeocodeOptions, GeocodeResult, GeocodingService, Suggestion};

const SERVICE_NAME: &str = "compass";

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Location resolution server")]
struct Args {
    /// Path to the TOML config file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    listen: String,
}

/// Application state shared across handlers
struct AppState {
    service: GeocodingService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Config::load_from_file(path)?
        }
        None => {
            info!("No config file given, using defaults");
            Config::default()
        }
    };

    info!("Compass Query Server");
    info!("Using spatial store at {}", config.store.url);

    let probe = PostgrestStore::new(
        &config.store.url,
        &config.store.api_key,
        config.store_timeout(),
    )?;
    match probe.health_check().await {
        Ok(true) => info!("Spatial store is reachable"),
        Ok(false) => warn!("Spatial store answered but reports unhealthy"),
        Err(e) => warn!("Spatial store not reachable yet: {}", e),
    }

    let service = GeocodingService::from_config(&config)?;
    info!(
        "Batch strategy {:?}, fuzzy threshold {}",
        config.batch.strategy, config.matching.fuzzy_threshold
    );

    let state = Arc::new(AppState { service });

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/v1/geocode", post(geocode_handler))
        .route("/api/v1/geocode/{location}", get(geocode_single_handler))
        .route("/api/v1/suggest/{location}", get(suggest_handler))
        .route("/api/v1/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Service information
async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        health: "/api/v1/health",
    })
}

#[derive(Serialize)]
struct RootResponse {
    service: &'static str,
    version: &'static str,
    status: &'static str,
    health: &'static str,
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Batch geocoding
async fn geocode_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GeocodeRequest>,
) -> Result<Json<GeocodeResponse>, (StatusCode, String)> {
    if request.locations.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "locations must contain at least one entry".to_string(),
        ));
    }

    info!("Geocoding request for {} location(s)", request.locations.len());
    let results = state
        .service
        .geocode_batch(&request.locations, request.options)
        .await;

    Ok(Json(GeocodeResponse::from_results(results)))
}

/// Single-location geocoding
async fn geocode_single_handler(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
    Query(options): Query<GeocodeOptions>,
) -> Json<GeocodeResponse> {
    let result = state.service.geocode_location(&location, options).await;
    Json(GeocodeResponse::from_results(vec![result]))
}

/// "Did you mean" suggestions
async fn suggest_handler(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
    Query(params): Query<SuggestQueryParams>,
) -> Result<Json<SuggestResponse>, (StatusCode, String)> {
    let limit = params
        .limit
        .unwrap_or(state.service.settings().suggestion_limit)
        .clamp(1, 20);

    let suggestions = state
        .service
        .suggest_alternatives(&location, limit)
        .await
        .map_err(|e| {
            tracing::error!("Suggestion lookup failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(SuggestResponse {
        input: location,
        suggestions,
    }))
}

#[derive(Deserialize)]
struct GeocodeRequest {
    locations: Vec<String>,
    #[serde(default)]
    options: GeocodeOptions,
}

#[derive(Deserialize)]
struct SuggestQueryParams {
    /// Number of suggestions
    limit: Option<usize>,
}

#[derive(Serialize, Debug)]
struct GeocodeResponse {
    results: Vec<GeocodeResult>,
    /// `"<input>: <error>"` for every failed location
    errors: Vec<String>,
}

impl GeocodeResponse {
    fn from_results(results: Vec<GeocodeResult>) -> Self {
        let errors = results
            .iter()
            .filter(|r| r.is_failure())
            .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {}", r.input, e)))
            .collect();
        Self { results, errors }
    }
}

#[derive(Serialize)]
struct SuggestResponse {
    input: String,
    suggestions: Vec<Suggestion>,
}
