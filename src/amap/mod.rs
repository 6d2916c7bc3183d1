pub mod client;
pub mod models;

use anyhow::Result;
use async_trait::async_trait;

use crate::amap::models::{Coordinates, Poi};

/// Nearby-search filter. The around-search endpoint accepts exactly one
/// of `types` (pipe-joined category codes) or `keywords` (pipe-joined
/// search terms) per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoiFilter {
    Types(String),
    Keywords(String),
}

impl PoiFilter {
    /// The query parameter name/value pair this filter contributes.
    pub fn query_param(&self) -> (&'static str, &str) {
        match self {
            Self::Types(types) => ("types", types),
            Self::Keywords(keywords) => ("keywords", keywords),
        }
    }
}

/// Capability to resolve addresses and fetch nearby POIs.
///
/// The scoring pipeline depends only on this trait, never on the
/// concrete HTTP client, so evaluations can run against scripted
/// providers in tests.
#[async_trait]
pub trait PoiProvider: Send + Sync {
    /// Resolve a free-text address to coordinates. `Ok(None)` means the
    /// service produced no usable result after retries; callers log and
    /// skip the address.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>>;

    /// Fetch all POIs around `center` within `radius_m`, paging until
    /// the service runs out of results. `label` names the query in logs
    /// and the raw backup.
    async fn search_around(
        &self,
        center: Coordinates,
        radius_m: u32,
        filter: &PoiFilter,
        label: &str,
    ) -> Result<Vec<Poi>>;
}
