//! PostgREST (Supabase) client for the places database.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::PlaceStore;
use crate::error::StoreError;
use crate::models::{Coordinate, Direction, MatchCandidate, Place, PlaceRecord};

const PLACE_COLUMNS: &str = "id,name,hierarchy_level,parent_id";

/// Store client speaking PostgREST's RPC dialect.
#[derive(Clone)]
pub struct PostgrestStore {
    client: Client,
    /// `{base}/rest/v1/`
    rest_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChildCount {
    parent_id: Uuid,
    child_count: u32,
}

impl PostgrestStore {
    /// Create a new store client for a Supabase project URL
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .user_agent("Compass/0.1 (geocoder)")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            rest_url: base.join("rest/v1/")?,
            api_key: api_key.to_string(),
        })
    }

    /// Check that the REST endpoint answers
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        let response = self
            .client
            .get(self.rest_url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    async fn rpc<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        function: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let url = self.rest_url.join(&format!("rpc/{}", function))?;
        debug!("Store RPC {}", function);

        let request = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(body);

        decode(request.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Status { status, body });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl PlaceStore for PostgrestStore {
    async fn fuzzy_name_search(
        &self,
        name: &str,
        threshold: f64,
    ) -> Result<Vec<MatchCandidate>, StoreError> {
        self.rpc(
            "search_places_fuzzy",
            &json!({
                "search_name": name,
                "similarity_threshold": threshold,
            }),
        )
        .await
    }

    async fn point_in_polygon(&self, point: Coordinate) -> Result<Option<Place>, StoreError> {
        let rows: Vec<Place> = self
            .rpc(
                "find_place_by_point",
                &json!({ "lon": point.lon, "lat": point.lat }),
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn places_in_direction(
        &self,
        base_place_ids: &[Uuid],
        direction: Direction,
    ) -> Result<Vec<PlaceRecord>, StoreError> {
        let rows: Vec<serde_json::Value> = self
            .rpc(
                "find_places_in_direction",
                &json!({
                    "base_place_ids": base_place_ids,
                    "direction": direction.as_str(),
                }),
            )
            .await?;

        // Mistyped rows become empty records, dropped by the caller.
        Ok(rows
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).unwrap_or_else(|e| {
                    warn!("Undecodable region row: {}", e);
                    PlaceRecord::default()
                })
            })
            .collect())
    }

    async fn children_count_batch(
        &self,
        parent_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u32>, StoreError> {
        if parent_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<ChildCount> = self
            .rpc("count_children_batch", &json!({ "parent_ids": parent_ids }))
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.parent_id, row.child_count))
            .collect())
    }

    async fn places_by_id_batch(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Place>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let id_list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut url = self.rest_url.join("places")?;
        url.query_pairs_mut()
            .append_pair("select", PLACE_COLUMNS)
            .append_pair("id", &format!("in.({})", id_list));

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let rows: Vec<Place> = decode(response).await?;
        Ok(rows.into_iter().map(|p| (p.id, p)).collect())
    }
}
