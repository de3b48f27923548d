use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cache::CacheTtls;
use crate::geocoder::DEFAULT_BASE_URL;

/// Longest accepted cache TTL, 100 years.
pub const MAX_TTL_SECS: i64 = 100 * 365 * 86_400;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub geocoder: GeocoderConfig,
    pub matching: MatchingConfig,
    pub cache: CacheConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub api_key: String,
    /// ISO 3166-1 alpha-2 code results are restricted to
    pub country: String,
    pub limit: usize,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            country: "pk".to_string(),
            limit: 5,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    pub fuzzy_threshold: f64,
    pub suggestion_threshold: f64,
    pub suggestion_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            suggestion_threshold: 0.5,
            suggestion_limit: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub place_capacity: usize,
    pub parser_capacity: usize,
    pub result_capacity: usize,
    pub fuzzy_ttl_secs: i64,
    pub directional_ttl_secs: i64,
    pub external_ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            place_capacity: 1000,
            parser_capacity: 256,
            result_capacity: 10_000,
            fuzzy_ttl_secs: 3600,
            directional_ttl_secs: 86_400,
            external_ttl_secs: 2_592_000,
        }
    }
}

impl CacheConfig {
    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            fuzzy: chrono::Duration::seconds(self.fuzzy_ttl_secs),
            directional: chrono::Duration::seconds(self.directional_ttl_secs),
            external: chrono::Duration::seconds(self.external_ttl_secs),
        }
    }
}

/// How batch siblings feed geocoder disambiguation.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStrategy {
    /// Context is the coordinates chosen by earlier locations in the batch.
    #[default]
    Sequential,
    /// Ambiguous geocoder hits wait until every other location has resolved.
    TwoPass,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BatchConfig {
    pub strategy: BatchStrategy,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("matching.fuzzy_threshold", self.matching.fuzzy_threshold),
            ("matching.suggestion_threshold", self.matching.suggestion_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1], got {}", name, value);
            }
        }

        for (name, value) in [
            ("matching.suggestion_limit", self.matching.suggestion_limit),
            ("geocoder.limit", self.geocoder.limit),
            ("cache.place_capacity", self.cache.place_capacity),
            ("cache.parser_capacity", self.cache.parser_capacity),
            ("cache.result_capacity", self.cache.result_capacity),
        ] {
            if value == 0 {
                bail!("{} must be greater than zero", name);
            }
        }

        for (name, value) in [
            ("cache.fuzzy_ttl_secs", self.cache.fuzzy_ttl_secs),
            ("cache.directional_ttl_secs", self.cache.directional_ttl_secs),
            ("cache.external_ttl_secs", self.cache.external_ttl_secs),
        ] {
            if value < 0 {
                bail!("{} must not be negative", name);
            }
            if value > MAX_TTL_SECS {
                bail!("{} must be at most {} seconds, got {}", name, MAX_TTL_SECS, value);
            }
        }

        if self.store.url.trim().is_empty() {
            bail!("store.url must be set");
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    pub fn geocoder_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoder.timeout_secs)
    }
}
