//! External text-to-coordinate geocoding.

mod cached;
mod locationiq;

pub use cached::CachedGeocoder;
pub use locationiq::{LocationIqGeocoder, DEFAULT_BASE_URL};

use async_trait::async_trait;

use crate::error::GeocoderError;
use crate::models::Coordinate;

/// A forward geocoder restricted to one country.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidate coordinates for `text`, most relevant first.
    ///
    /// "Nothing found" is `Ok(vec![])`; `Err` means the service could not be reached.
    async fn geocode(&self, text: &str, country: &str) -> Result<Vec<Coordinate>, GeocoderError>;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for std::sync::Arc<G> {
    async fn geocode(&self, text: &str, country: &str) -> Result<Vec<Coordinate>, GeocoderError> {
        (**self).geocode(text, country).await
    }
}
