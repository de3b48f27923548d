use async_trait::async_trait;
use std::sync::Arc;

use super::Geocoder;
use crate::cache::{external_identifier, CacheCategory, ResultCache};
use crate::error::GeocoderError;
use crate::models::Coordinate;

/// Geocoder decorator caching successful lookups by normalized text and country.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: Arc<ResultCache>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G, cache: Arc<ResultCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn geocode(&self, text: &str, country: &str) -> Result<Vec<Coordinate>, GeocoderError> {
        let key = external_identifier(text, country);
        if let Some(hit) = self.cache.get(CacheCategory::External, &key) {
            return Ok(hit);
        }

        let coords = self.inner.geocode(text, country).await?;
        self.cache.set(CacheCategory::External, &key, &coords);
        Ok(coords)
    }
}
