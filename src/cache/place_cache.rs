use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use super::FifoCache;
use crate::error::StoreError;
use crate::models::Place;
use crate::store::PlaceStore;

/// Bounded cache of place records by id, filled from the store on miss.
///
/// Place records are immutable reference data, so entries never expire; the
/// oldest-inserted record is evicted once `capacity` is reached.
#[derive(Debug)]
pub struct PlaceCache {
    entries: Mutex<FifoCache<Uuid, Place>>,
}

impl PlaceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(FifoCache::new(capacity)),
        }
    }

    /// Look up `ids`, fetching the misses from `store` in one batch.
    ///
    /// Ids unknown to the store are absent from the result.
    pub async fn get_many<S: PlaceStore + ?Sized>(
        &self,
        store: &S,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Place>, StoreError> {
        let mut found = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();
        {
            let entries = self.entries();
            for id in ids {
                match entries.get(id) {
                    Some(place) => {
                        found.insert(*id, place.clone());
                    }
                    None if !missing.contains(id) => missing.push(*id),
                    None => {}
                }
            }
        }

        if missing.is_empty() {
            return Ok(found);
        }

        debug!(
            "Place cache: {} hits, fetching {} from store",
            found.len(),
            missing.len()
        );
        let fetched = store.places_by_id_batch(&missing).await?;

        let mut entries = self.entries();
        for (id, place) in fetched {
            entries.insert(id, place.clone());
            found.insert(id, place);
        }
        Ok(found)
    }

    pub fn insert(&self, place: Place) {
        self.entries().insert(place.id, place);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, FifoCache<Uuid, Place>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
