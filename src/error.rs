//! Error types for store access, external geocoding and resolution.

use thiserror::Error;

use crate::models::{Coordinate, Direction, Suggestion};

/// Failure talking to the spatial store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid store response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid store url: {0}")]
    Url(#[from] url::ParseError),
}

/// Failure talking to the external geocoder.
///
/// Callers treat every variant as "no results"; the distinction only matters
/// for logging.
#[derive(Error, Debug)]
pub enum GeocoderError {
    #[error("geocoder transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geocoder returned {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid geocoder response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid geocoder url: {0}")]
    Url(#[from] url::ParseError),
}

/// Why one location could not be resolved.
///
/// The `Display` output is what ends up in `GeocodeResult::error`.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Empty location string")]
    EmptyInput,

    #[error("No place names found after parsing direction '{0}'")]
    MissingBasePlace(Direction),

    #[error("No match found in database or external geocoding service{}", did_you_mean(.suggestions))]
    NoMatch { suggestions: Vec<Suggestion> },

    #[error("Coordinates {0} not within known administrative boundaries")]
    OutOfBounds(Coordinate),

    #[error("Could not match any base places: {}", .names.join(", "))]
    UnresolvedBasePlaces { names: Vec<String> },

    #[error("No places found in {0} region")]
    EmptyRegion(Direction),

    #[error("Store returned malformed place records ({dropped} dropped)")]
    MalformedUpstreamData { dropped: usize },

    #[error("resolution failed: {0}")]
    Store(#[from] StoreError),
}

fn did_you_mean(suggestions: &[Suggestion]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = suggestions.iter().map(|s| s.name.as_str()).collect();
    format!(". Did you mean: {}?", names.join(", "))
}
