//! Cached, asynchronous test-data generation.
//!
//! The orchestrator wraps an abstract [`DataGenerator`] with a TTL cache keyed
//! by request signature, tracks per-generation status, enriches results with
//! optional quality analysis and fans bulk requests out across tokio tasks.

pub mod cache;
pub mod capability;
pub mod errors;
pub mod model;
pub mod orchestrator;
pub mod sample;
pub mod status;

pub use cache::{CacheEntry, GenerationCache, cache_signature};
pub use capability::{DataGenerator, QualityAnalyzer};
pub use errors::GenerateError;
pub use model::{CACHE_TTL_MINUTES, MAX_CACHE_SIZE, OrchestratorConfig, ServiceStatistics};
pub use orchestrator::GenerationOrchestrator;
pub use sample::{CompletenessAnalyzer, SampleDataGenerator};
pub use status::{GenerationState, GenerationStatus, StatusIndex};
