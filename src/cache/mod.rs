//! In-process caches shared across requests.

mod fifo;
mod place_cache;
mod result_cache;

pub use fifo::FifoCache;
pub use place_cache::PlaceCache;
pub use result_cache::{
    directional_identifier, external_identifier, fuzzy_identifier, CacheCategory, CacheTtls,
    ResultCache,
};
