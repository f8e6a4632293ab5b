//! Cache types for marketplace API responses.

use std::time::{Duration, Instant};

use moka::Expiry;
use ocop_core::{District, DistrictId, Province, ProvinceId, Ward};

use super::types::ProductPage;

const SEARCH_TTL: Duration = Duration::from_secs(60);
const DIRECTORY_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache key for product pages and address directory lists.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Search { query: String, page: u32, limit: u32 },
    Featured { limit: u32 },
    Provinces,
    Districts(ProvinceId),
    Wards(DistrictId),
}

impl CacheKey {
    /// How long an entry under this key stays fresh.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        match self {
            Self::Search { .. } | Self::Featured { .. } => SEARCH_TTL,
            Self::Provinces | Self::Districts(_) | Self::Wards(_) => DIRECTORY_TTL,
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(ProductPage),
    Provinces(Vec<Province>),
    Districts(Vec<District>),
    Wards(Vec<Ward>),
}

/// Per-key time to live.
pub struct KeyTtl;

impl Expiry<CacheKey, CacheValue> for KeyTtl {
    fn expire_after_create(
        &self,
        key: &CacheKey,
        _value: &CacheValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(key.ttl())
    }
}
