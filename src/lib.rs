//! Compass - resolves free-text location references to administrative places
//!
//! This library provides the resolution engine used by the query binary:
//! directional parsing, name matching, spatial disambiguation and hierarchy
//! aggregation over a PostgREST-backed spatial store.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod geocoder;
pub mod matching;
pub mod models;
pub mod parser;
pub mod service;
pub mod spatial;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::ResolveError;
pub use models::{Direction, GeocodeOptions, GeocodeResult, MatchedPlace, Place, Suggestion};
pub use service::GeocodingService;
