//! LocationIQ forward geocoding client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::Geocoder;
use crate::error::GeocoderError;
use crate::models::Coordinate;

pub const DEFAULT_BASE_URL: &str = "https://us1.locationiq.com/v1";

/// LocationIQ `/search` client
#[derive(Clone)]
pub struct LocationIqGeocoder {
    client: Client,
    search_url: Url,
    api_key: String,
    limit: usize,
}

/// One search hit. LocationIQ encodes coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: Option<serde_json::Value>,
    lon: Option<serde_json::Value>,
}

impl SearchHit {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(
            parse_number(self.lon.as_ref()?)?,
            parse_number(self.lat.as_ref()?)?,
        ))
    }
}

fn parse_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

impl LocationIqGeocoder {
    /// `timeout` bounds every request; a timed-out request counts as a transport error.
    pub fn new(
        base_url: &str,
        api_key: &str,
        limit: usize,
        timeout: Duration,
    ) -> Result<Self, GeocoderError> {
        let mut search_url = Url::parse(base_url)?;
        let path = format!("{}/search", search_url.path().trim_end_matches('/'));
        search_url.set_path(&path);

        Ok(Self {
            client: Client::builder()
                .user_agent("Compass/0.1 (geocoder)")
                .timeout(timeout)
                .build()?,
            search_url,
            api_key: api_key.to_string(),
            limit,
        })
    }
}

#[async_trait]
impl Geocoder for LocationIqGeocoder {
    async fn geocode(&self, text: &str, country: &str) -> Result<Vec<Coordinate>, GeocoderError> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("q", text)
            .append_pair("format", "json")
            .append_pair("countrycodes", country)
            .append_pair("limit", &self.limit.to_string());

        let response = self.client.get(url).send().await?;

        // LocationIQ answers 404 when nothing matched
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No geocoding results for '{}'", text);
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(GeocoderError::Status(response.status()));
        }

        let bytes = response.bytes().await?;
        let hits: Vec<SearchHit> = serde_json::from_slice(&bytes)?;

        let total = hits.len();
        let coords: Vec<Coordinate> = hits
            .iter()
            .filter_map(SearchHit::coordinate)
            .take(self.limit)
            .collect();

        if coords.len() < total.min(self.limit) {
            warn!(
                "Dropped {} geocoding hits without coordinates for '{}'",
                total.min(self.limit) - coords.len(),
                text
            );
        }

        Ok(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve;
    use axum::extract::Query;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn geocoder(base: &str, timeout: Duration) -> LocationIqGeocoder {
        LocationIqGeocoder::new(base, "k", 5, timeout).unwrap()
    }

    #[tokio::test]
    async fn test_parses_string_coordinates() {
        let app = Router::new().route(
            "/v1/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["countrycodes"], "pk");
                assert_eq!(params["limit"], "5");
                Json(json!([
                    { "lat": "31.5204", "lon": "74.3587", "display_name": "Lahore" },
                    { "lat": "25.3960", "lon": "68.3578" },
                    { "display_name": "no coordinates" }
                ]))
            }),
        );
        let base = serve(app).await;

        let coords = geocoder(&format!("{}/v1", base), Duration::from_secs(5))
            .geocode("Lahore", "pk")
            .await
            .unwrap();

        assert_eq!(
            coords,
            vec![Coordinate::new(74.3587, 31.5204), Coordinate::new(68.3578, 25.396)]
        );
    }

    #[tokio::test]
    async fn test_not_found_is_empty() {
        let app = Router::new().route(
            "/v1/search",
            get(|| async { (AxumStatus::NOT_FOUND, Json(json!({ "error": "Unable to geocode" }))) }),
        );
        let base = serve(app).await;

        let coords = geocoder(&format!("{}/v1/", base), Duration::from_secs(5))
            .geocode("Atlantis", "pk")
            .await
            .unwrap();
        assert!(coords.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_status_error() {
        let app = Router::new().route(
            "/v1/search",
            get(|| async { AxumStatus::TOO_MANY_REQUESTS }),
        );
        let base = serve(app).await;

        let err = geocoder(&format!("{}/v1", base), Duration::from_secs(5))
            .geocode("Lahore", "pk")
            .await
            .unwrap_err();
        assert!(matches!(err, GeocoderError::Status(s) if s.as_u16() == 429));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let app = Router::new().route(
            "/v1/search",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!([]))
            }),
        );
        let base = serve(app).await;

        let err = geocoder(&format!("{}/v1", base), Duration::from_millis(100))
            .geocode("Lahore", "pk")
            .await
            .unwrap_err();
        assert!(matches!(err, GeocoderError::Transport(_)));
    }
}
