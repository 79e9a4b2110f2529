use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cache capacity.
pub const MAX_CACHE_SIZE: usize = 1000;
/// Default cache entry lifetime, in minutes.
pub const CACHE_TTL_MINUTES: u64 = 60;

/// Options for the generation orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of cached results.
    pub max_cache_size: usize,
    /// Lifetime of a cached result.
    pub cache_ttl: Duration,
    /// Serve and store results through the cache.
    pub enable_caching: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_cache_size: MAX_CACHE_SIZE,
            cache_ttl: Duration::from_secs(CACHE_TTL_MINUTES * 60),
            enable_caching: true,
        }
    }
}

/// Snapshot of orchestrator activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatistics {
    pub total_generations: usize,
    pub active_generations: usize,
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Percentage of cache lookups that hit.
    pub cache_hit_rate: f64,
    /// Mean quality score over results that carried a quality report.
    pub average_quality_score: f64,
    pub healthy: bool,
    pub provider: String,
    pub model: String,
}
