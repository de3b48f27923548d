//! Core data models for location resolution.

pub mod direction;
pub mod place;
pub mod result;

pub use direction::Direction;
pub use place::{
    Coordinate, MatchCandidate, MissingField, Place, PlaceRecord, DISTRICT_LEVEL,
    SUB_DISTRICT_LEVEL,
};
pub use result::{
    GeocodeOptions, GeocodeResult, MatchMethod, MatchedPlace, Suggestion, EXACT_MATCH_SIMILARITY,
};
