//! In-memory fakes for the store and geocoder seams.

use async_trait::async_trait;
use axum::Router;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{GeocoderError, StoreError};
use crate::geocoder::Geocoder;
use crate::models::{Coordinate, Direction, MatchCandidate, Place, PlaceRecord};
use crate::store::PlaceStore;

pub fn place(name: &str, level: u8, parent_id: Option<Uuid>) -> Place {
    Place {
        id: Uuid::new_v4(),
        name: name.to_string(),
        hierarchy_level: level,
        parent_id,
    }
}

/// Serve `app` on an ephemeral local port, returning its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn unavailable() -> StoreError {
    StoreError::Status {
        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        body: "store offline".to_string(),
    }
}

#[derive(Default)]
pub struct FakeStore {
    candidates: HashMap<String, Vec<MatchCandidate>>,
    containing: Vec<(Coordinate, Place)>,
    regions: HashMap<Direction, Vec<PlaceRecord>>,
    places: HashMap<Uuid, Place>,
    failing: HashSet<&'static str>,
    failing_below: Option<f64>,
    calls: Mutex<HashMap<&'static str, usize>>,
    searches: Mutex<Vec<(String, f64)>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer fuzzy searches for `query` (case-insensitive) with `place`.
    pub fn with_candidate(mut self, query: &str, place: Place, score: f64) -> Self {
        self.candidates
            .entry(query.to_lowercase())
            .or_default()
            .push(MatchCandidate {
                place,
                similarity_score: score,
            });
        self
    }

    pub fn with_containing(mut self, point: Coordinate, place: Place) -> Self {
        self.containing.push((point, place));
        self
    }

    pub fn with_region(mut self, direction: Direction, records: Vec<PlaceRecord>) -> Self {
        self.regions.insert(direction, records);
        self
    }

    /// Register reference places; child counts are derived from their parent ids.
    pub fn with_places(mut self, places: impl IntoIterator<Item = Place>) -> Self {
        for p in places {
            self.places.insert(p.id, p);
        }
        self
    }

    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Fail fuzzy searches run at a threshold below `threshold` only.
    pub fn failing_below(mut self, threshold: f64) -> Self {
        self.failing_below = Some(threshold);
        self
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    /// Every `(name, threshold)` passed to `fuzzy_name_search`.
    pub fn searches(&self) -> Vec<(String, f64)> {
        self.searches.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) -> Result<(), StoreError> {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;
        if self.failing.contains(operation) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl PlaceStore for FakeStore {
    async fn fuzzy_name_search(
        &self,
        name: &str,
        threshold: f64,
    ) -> Result<Vec<MatchCandidate>, StoreError> {
        self.searches
            .lock()
            .unwrap()
            .push((name.to_string(), threshold));
        self.record("fuzzy_name_search")?;
        if self.failing_below.is_some_and(|limit| threshold < limit) {
            return Err(unavailable());
        }

        Ok(self
            .candidates
            .get(&name.trim().to_lowercase())
            .map(|cs| {
                cs.iter()
                    .filter(|c| c.similarity_score >= threshold)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn point_in_polygon(&self, point: Coordinate) -> Result<Option<Place>, StoreError> {
        self.record("point_in_polygon")?;
        Ok(self
            .containing
            .iter()
            .find(|(p, _)| *p == point)
            .map(|(_, place)| place.clone()))
    }

    async fn places_in_direction(
        &self,
        _base_place_ids: &[Uuid],
        direction: Direction,
    ) -> Result<Vec<PlaceRecord>, StoreError> {
        self.record("places_in_direction")?;
        Ok(self.regions.get(&direction).cloned().unwrap_or_default())
    }

    async fn children_count_batch(
        &self,
        parent_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u32>, StoreError> {
        self.record("children_count_batch")?;
        let mut counts = HashMap::new();
        for child in self.places.values() {
            if let Some(parent) = child.parent_id.filter(|p| parent_ids.contains(p)) {
                *counts.entry(parent).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn places_by_id_batch(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Place>, StoreError> {
        self.record("places_by_id_batch")?;
        Ok(ids
            .iter()
            .filter_map(|id| self.places.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}

#[derive(Default)]
pub struct FakeGeocoder {
    results: HashMap<String, Vec<Coordinate>>,
    unreachable: bool,
    calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, text: &str, coords: Vec<Coordinate>) -> Self {
        self.results.insert(text.to_lowercase(), coords);
        self
    }

    /// Fail every call as if the service were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, text: &str, _country: &str) -> Result<Vec<Coordinate>, GeocoderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(GeocoderError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        Ok(self
            .results
            .get(&text.trim().to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}
