//! Access to the spatial reference store.
//!
//! Similarity scoring and polygon tests live in the database; this crate
//! only consumes them through [`PlaceStore`].

mod cached;
mod postgrest;

pub use cached::CachedPlaceStore;
pub use postgrest::PostgrestStore;

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Coordinate, Direction, MatchCandidate, Place, PlaceRecord};

/// Capabilities consumed from the spatial store.
#[async_trait]
pub trait PlaceStore: Send + Sync {
    /// Places whose name similarity to `name` is at least `threshold`.
    async fn fuzzy_name_search(
        &self,
        name: &str,
        threshold: f64,
    ) -> Result<Vec<MatchCandidate>, StoreError>;

    /// Most specific place whose polygon contains the point.
    async fn point_in_polygon(&self, point: Coordinate) -> Result<Option<Place>, StoreError>;

    /// Places intersecting the `direction` partition of the union of the base places.
    ///
    /// Rows are returned unvalidated.
    async fn places_in_direction(
        &self,
        base_place_ids: &[Uuid],
        direction: Direction,
    ) -> Result<Vec<PlaceRecord>, StoreError>;

    /// True number of children per parent. Parents without children may be absent.
    async fn children_count_batch(
        &self,
        parent_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u32>, StoreError>;

    /// Place records by id. Unknown ids are absent from the map.
    async fn places_by_id_batch(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Place>, StoreError>;
}

/// Shared stores, so a test can keep a handle on the same instance the service uses.
#[async_trait]
impl<S: PlaceStore + ?Sized> PlaceStore for std::sync::Arc<S> {
    async fn fuzzy_name_search(
        &self,
        name: &str,
        threshold: f64,
    ) -> Result<Vec<MatchCandidate>, StoreError> {
        (**self).fuzzy_name_search(name, threshold).await
    }

    async fn point_in_polygon(&self, point: Coordinate) -> Result<Option<Place>, StoreError> {
        (**self).point_in_polygon(point).await
    }

    async fn places_in_direction(
        &self,
        base_place_ids: &[Uuid],
        direction: Direction,
    ) -> Result<Vec<PlaceRecord>, StoreError> {
        (**self).places_in_direction(base_place_ids, direction).await
    }

    async fn children_count_batch(
        &self,
        parent_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u32>, StoreError> {
        (**self).children_count_batch(parent_ids).await
    }

    async fn places_by_id_batch(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Place>, StoreError> {
        (**self).places_by_id_batch(ids).await
    }
}
