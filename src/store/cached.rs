//! Result-caching decorator around a [`PlaceStore`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::PlaceStore;
use crate::cache::{directional_identifier, fuzzy_identifier, CacheCategory, ResultCache};
use crate::error::StoreError;
use crate::models::{Coordinate, Direction, MatchCandidate, Place, PlaceRecord};

/// Caches fuzzy searches and region queries; everything else passes through.
///
/// Errors are never cached, so a failed call is retried on the next request.
pub struct CachedPlaceStore<S> {
    inner: S,
    cache: Arc<ResultCache>,
}

impl<S: PlaceStore> CachedPlaceStore<S> {
    pub fn new(inner: S, cache: Arc<ResultCache>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: PlaceStore> PlaceStore for CachedPlaceStore<S> {
    async fn fuzzy_name_search(
        &self,
        name: &str,
        threshold: f64,
    ) -> Result<Vec<MatchCandidate>, StoreError> {
        let key = fuzzy_identifier(name, threshold);
        if let Some(hit) = self.cache.get(CacheCategory::Fuzzy, &key) {
            return Ok(hit);
        }

        let candidates = self.inner.fuzzy_name_search(name, threshold).await?;
        self.cache.set(CacheCategory::Fuzzy, &key, &candidates);
        Ok(candidates)
    }

    async fn point_in_polygon(&self, point: Coordinate) -> Result<Option<Place>, StoreError> {
        self.inner.point_in_polygon(point).await
    }

    async fn places_in_direction(
        &self,
        base_place_ids: &[Uuid],
        direction: Direction,
    ) -> Result<Vec<PlaceRecord>, StoreError> {
        let key = directional_identifier(base_place_ids, direction);
        if let Some(hit) = self.cache.get(CacheCategory::Directional, &key) {
            return Ok(hit);
        }

        let records = self
            .inner
            .places_in_direction(base_place_ids, direction)
            .await?;
        self.cache.set(CacheCategory::Directional, &key, &records);
        Ok(records)
    }

    async fn children_count_batch(
        &self,
        parent_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u32>, StoreError> {
        self.inner.children_count_batch(parent_ids).await
    }

    async fn places_by_id_batch(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Place>, StoreError> {
        self.inner.places_by_id_batch(ids).await
    }
}
