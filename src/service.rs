//! Resolution of free-text location references to places.
//!
//! [`GeocodingService`] routes each input through the directional parser to
//! one of two paths. Plain names go to the fuzzy name search and fall back to
//! the external geocoder plus a point-in-polygon lookup. Directional phrases
//! resolve their base place, fetch the matching region from the store and
//! aggregate it up the hierarchy.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::aggregate::HierarchyAggregator;
use crate::cache::{PlaceCache, ResultCache};
use crate::config::{BatchStrategy, Config};
use crate::error::ResolveError;
use crate::geocoder::{CachedGeocoder, Geocoder, LocationIqGeocoder};
use crate::matching::{effective_threshold, select_candidate, top_suggestions};
use crate::models::{
    Coordinate, Direction, GeocodeOptions, GeocodeResult, MatchMethod, MatchedPlace, Place,
    Suggestion,
};
use crate::parser::DirectionalParser;
use crate::spatial::disambiguate;
use crate::store::{CachedPlaceStore, PlaceStore, PostgrestStore};

/// Tunables the service reads on every request.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub country: String,
    pub fuzzy_threshold: f64,
    pub suggestion_threshold: f64,
    pub suggestion_limit: usize,
    pub batch_strategy: BatchStrategy,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            country: config.geocoder.country.clone(),
            fuzzy_threshold: config.matching.fuzzy_threshold,
            suggestion_threshold: config.matching.suggestion_threshold,
            suggestion_limit: config.matching.suggestion_limit,
            batch_strategy: config.batch.strategy,
        }
    }
}

/// How to treat several geocoder hits for one name.
#[derive(Clone, Copy)]
enum Disambiguation<'a> {
    /// Choose now, by proximity to these points.
    Near(&'a [Coordinate]),
    /// Hand the hits back so the batch can choose later.
    Defer,
}

enum Outcome {
    Resolved {
        result: GeocodeResult,
        /// Coordinate the geocoder path settled on, usable as batch context.
        point: Option<Coordinate>,
    },
    Ambiguous {
        name: String,
        candidates: Vec<Coordinate>,
    },
}

impl Outcome {
    fn resolved(result: GeocodeResult) -> Self {
        Outcome::Resolved {
            result,
            point: None,
        }
    }
}

pub struct GeocodingService {
    store: Arc<dyn PlaceStore>,
    geocoder: Arc<dyn Geocoder>,
    parser: DirectionalParser,
    places: PlaceCache,
    settings: ServiceSettings,
}

impl GeocodingService {
    pub fn new(
        store: Arc<dyn PlaceStore>,
        geocoder: Arc<dyn Geocoder>,
        parser: DirectionalParser,
        places: PlaceCache,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            geocoder,
            parser,
            places,
            settings,
        }
    }

    /// Wire the PostgREST store and LocationIQ geocoder behind one shared result cache.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let results = Arc::new(ResultCache::new(
            config.cache.result_capacity,
            config.cache.ttls(),
        ));

        let store = PostgrestStore::new(
            &config.store.url,
            &config.store.api_key,
            config.store_timeout(),
        )
        .context("Failed to create store client")?;

        let geocoder = LocationIqGeocoder::new(
            &config.geocoder.base_url,
            &config.geocoder.api_key,
            config.geocoder.limit,
            config.geocoder_timeout(),
        )
        .context("Failed to create geocoder client")?;

        let parser = DirectionalParser::new(config.cache.parser_capacity)
            .context("Failed to compile direction patterns")?;

        Ok(Self::new(
            Arc::new(CachedPlaceStore::new(store, results.clone())),
            Arc::new(CachedGeocoder::new(geocoder, results)),
            parser,
            PlaceCache::new(config.cache.place_capacity),
            ServiceSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Resolve one location on its own, without batch context.
    pub async fn geocode_location(&self, location: &str, options: GeocodeOptions) -> GeocodeResult {
        match self
            .resolve(location, options, Disambiguation::Near(&[]))
            .await
        {
            Outcome::Resolved { result, .. } => result,
            // Never produced for `Near`.
            Outcome::Ambiguous { .. } => GeocodeResult::failed(
                location,
                ResolveError::NoMatch {
                    suggestions: Vec::new(),
                },
            ),
        }
    }

    /// Resolve every location, one result per input in input order.
    ///
    /// A failing location never affects the others.
    pub async fn geocode_batch(
        &self,
        locations: &[String],
        options: GeocodeOptions,
    ) -> Vec<GeocodeResult> {
        let results = match self.settings.batch_strategy {
            BatchStrategy::Sequential => self.batch_sequential(locations, options).await,
            BatchStrategy::TwoPass => self.batch_two_pass(locations, options).await,
        };

        let failed = results.iter().filter(|r| r.is_failure()).count();
        info!(
            "Geocoded batch of {}: {} resolved, {} failed",
            results.len(),
            results.len() - failed,
            failed
        );
        results
    }

    /// First matched place id per location, default options.
    pub async fn geocode_batch_simple(&self, locations: &[String]) -> Vec<Option<Uuid>> {
        self.geocode_batch(locations, GeocodeOptions::default())
            .await
            .iter()
            .map(GeocodeResult::primary_id)
            .collect()
    }

    /// Low-threshold name matches for a location, best first.
    pub async fn suggest_alternatives(
        &self,
        location: &str,
        limit: usize,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        let name = location.trim();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .store
            .fuzzy_name_search(name, self.settings.suggestion_threshold)
            .await?;
        Ok(top_suggestions(candidates, limit)
            .into_iter()
            .map(Suggestion::from)
            .collect())
    }

    async fn batch_sequential(
        &self,
        locations: &[String],
        options: GeocodeOptions,
    ) -> Vec<GeocodeResult> {
        let mut context: Vec<Coordinate> = Vec::new();
        let mut results = Vec::with_capacity(locations.len());

        for location in locations {
            let outcome = self
                .resolve(location, options, Disambiguation::Near(&context))
                .await;
            match outcome {
                Outcome::Resolved { result, point } => {
                    context.extend(point);
                    results.push(result);
                }
                Outcome::Ambiguous { .. } => results.push(GeocodeResult::failed(
                    location,
                    ResolveError::NoMatch {
                        suggestions: Vec::new(),
                    },
                )),
            }
        }
        results
    }

    async fn batch_two_pass(
        &self,
        locations: &[String],
        options: GeocodeOptions,
    ) -> Vec<GeocodeResult> {
        let mut outcomes = Vec::with_capacity(locations.len());
        for location in locations {
            outcomes.push(self.resolve(location, options, Disambiguation::Defer).await);
        }

        let context: Vec<Coordinate> = outcomes
            .iter()
            .filter_map(|o| match o {
                Outcome::Resolved { point, .. } => *point,
                Outcome::Ambiguous { .. } => None,
            })
            .collect();

        let deferred = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Ambiguous { .. }))
            .count();
        if deferred > 0 {
            debug!(
                "Disambiguating {} deferred location(s) against {} resolved point(s)",
                deferred,
                context.len()
            );
        }

        let mut results = Vec::with_capacity(outcomes.len());
        for (location, outcome) in locations.iter().zip(outcomes) {
            let result = match outcome {
                Outcome::Resolved { result, .. } => result,
                Outcome::Ambiguous { name, candidates } => {
                    match self.locate(location, &name, &candidates, &context).await {
                        Ok((result, _)) => result,
                        Err(err) => self.failed(location, err),
                    }
                }
            };
            results.push(result);
        }
        results
    }

    /// Per-location error boundary.
    async fn resolve(
        &self,
        location: &str,
        options: GeocodeOptions,
        disambiguation: Disambiguation<'_>,
    ) -> Outcome {
        match self.try_resolve(location, options, disambiguation).await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::resolved(self.failed(location, err)),
        }
    }

    async fn try_resolve(
        &self,
        location: &str,
        options: GeocodeOptions,
        disambiguation: Disambiguation<'_>,
    ) -> Result<Outcome, ResolveError> {
        if location.trim().is_empty() {
            return Err(ResolveError::EmptyInput);
        }

        let parsed = self.parser.parse(location);
        match parsed.direction {
            Some(direction) => {
                if parsed.place_name.is_empty() {
                    return Err(ResolveError::MissingBasePlace(direction));
                }
                let names = [parsed.place_name];
                self.resolve_directional(location, direction, &names, options)
                    .await
                    .map(Outcome::resolved)
            }
            None => {
                self.resolve_simple(location, &parsed.place_name, options, disambiguation)
                    .await
            }
        }
    }

    async fn resolve_simple(
        &self,
        input: &str,
        name: &str,
        options: GeocodeOptions,
        disambiguation: Disambiguation<'_>,
    ) -> Result<Outcome, ResolveError> {
        if let Some(matched) = self.match_name(name, options).await? {
            return Ok(Outcome::resolved(GeocodeResult::matched(input, vec![matched])));
        }

        info!("Fuzzy match failed for '{}', trying external geocoding", name);
        let candidates = match self.geocoder.geocode(name, &self.settings.country).await {
            Ok(coords) => coords,
            Err(err) => {
                error!("External geocoding failed for '{}': {}", name, err);
                Vec::new()
            }
        };

        if candidates.is_empty() {
            return Err(self.no_match(name).await);
        }

        match disambiguation {
            Disambiguation::Defer if candidates.len() > 1 => Ok(Outcome::Ambiguous {
                name: name.to_string(),
                candidates,
            }),
            Disambiguation::Defer => self.locate_outcome(input, name, &candidates, &[]).await,
            Disambiguation::Near(context) => {
                self.locate_outcome(input, name, &candidates, context).await
            }
        }
    }

    async fn locate_outcome(
        &self,
        input: &str,
        name: &str,
        candidates: &[Coordinate],
        context: &[Coordinate],
    ) -> Result<Outcome, ResolveError> {
        let (result, point) = self.locate(input, name, candidates, context).await?;
        Ok(Outcome::Resolved {
            result,
            point: Some(point),
        })
    }

    /// Pick one geocoder hit and find the place containing it.
    async fn locate(
        &self,
        input: &str,
        name: &str,
        candidates: &[Coordinate],
        context: &[Coordinate],
    ) -> Result<(GeocodeResult, Coordinate), ResolveError> {
        let point = match disambiguate(candidates, context) {
            Ok(point) => point,
            Err(_) => return Err(self.no_match(name).await),
        };
        if candidates.len() > 1 {
            debug!(
                "Chose {} for '{}' among {} candidates",
                point,
                name,
                candidates.len()
            );
        }

        let place = self
            .store
            .point_in_polygon(point)
            .await?
            .ok_or(ResolveError::OutOfBounds(point))?;

        let matched = MatchedPlace::from_place(&place, MatchMethod::PointInPolygon);
        Ok((GeocodeResult::matched(input, vec![matched]), point))
    }

    async fn resolve_directional(
        &self,
        input: &str,
        direction: Direction,
        names: &[String],
        options: GeocodeOptions,
    ) -> Result<GeocodeResult, ResolveError> {
        let mut base_ids = Vec::new();
        let mut base_names = Vec::new();
        for name in names {
            match self.match_name(name, options).await {
                Ok(Some(matched)) => {
                    base_ids.push(matched.id);
                    base_names.push(matched.name);
                }
                Ok(None) => warn!("Could not match base place: {}", name),
                Err(err) => warn!("Lookup of base place {} failed: {}", name, err),
            }
        }

        if base_ids.is_empty() {
            return Err(ResolveError::UnresolvedBasePlaces {
                names: names.to_vec(),
            });
        }

        info!(
            "Resolving {} region of {}",
            direction,
            base_names.join(", ")
        );
        let mut result = match self.region_places(&base_ids, direction).await {
            Ok(places) => GeocodeResult::matched(
                input,
                places
                    .iter()
                    .map(|p| MatchedPlace::from_place(p, MatchMethod::DirectionalIntersection))
                    .collect(),
            ),
            Err(err) => self.failed(input, err),
        };
        result.regions_processed = Some(base_names);
        result.direction = Some(direction);
        Ok(result)
    }

    async fn region_places(
        &self,
        base_ids: &[Uuid],
        direction: Direction,
    ) -> Result<Vec<Place>, ResolveError> {
        let records = self.store.places_in_direction(base_ids, direction).await?;
        if records.is_empty() {
            return Err(ResolveError::EmptyRegion(direction));
        }

        let total = records.len();
        let mut places = Vec::with_capacity(total);
        for record in records {
            match Place::try_from(record) {
                Ok(place) => places.push(place),
                Err(err) => warn!("Dropping region record: {}", err),
            }
        }
        if places.is_empty() {
            return Err(ResolveError::MalformedUpstreamData { dropped: total });
        }

        debug!("{} region returned {} places", direction, places.len());
        let aggregated = HierarchyAggregator::new(self.store.as_ref(), &self.places)
            .aggregate(places)
            .await?;
        Ok(aggregated)
    }

    /// Fuzzy-search `name` and select the best candidate, if any.
    async fn match_name(
        &self,
        name: &str,
        options: GeocodeOptions,
    ) -> Result<Option<MatchedPlace>, ResolveError> {
        let threshold = effective_threshold(name, self.settings.fuzzy_threshold);
        let candidates = self.store.fuzzy_name_search(name, threshold).await?;
        debug!(
            "'{}' at threshold {:.2}: {} candidates",
            name,
            threshold,
            candidates.len()
        );

        let Some(best) = select_candidate(&candidates, options.prefer_lower_admin_levels) else {
            return Ok(None);
        };
        for candidate in &candidates {
            self.places.insert(candidate.place.clone());
        }
        Ok(Some(MatchedPlace::from_candidate(
            best,
            options.include_confidence_scores,
        )))
    }

    async fn no_match(&self, name: &str) -> ResolveError {
        let suggestions = self
            .suggest_alternatives(name, self.settings.suggestion_limit)
            .await
            .unwrap_or_default();
        ResolveError::NoMatch { suggestions }
    }

    fn failed(&self, input: &str, err: ResolveError) -> GeocodeResult {
        match &err {
            ResolveError::Store(_) => error!("Geocoding failed for '{}': {}", input, err),
            _ => info!("No result for '{}': {}", input, err),
        }
        GeocodeResult::failed(input, err)
    }
}
