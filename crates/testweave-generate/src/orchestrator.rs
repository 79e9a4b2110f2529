use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::FutureExt;
use futures::future::join_all;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use testweave_core::{GeneratedDataResult, GenerationRequest, new_id};

use crate::cache::{GenerationCache, cache_signature};
use crate::capability::{DataGenerator, QualityAnalyzer};
use crate::errors::GenerateError;
use crate::model::{OrchestratorConfig, ServiceStatistics};
use crate::status::{GenerationStatus, StatusIndex};

/// Drives generation requests through the cache and the generation capability.
///
/// Cloning is cheap; clones share the cache and status index.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    generator: Arc<dyn DataGenerator>,
    analyzer: Option<Arc<dyn QualityAnalyzer>>,
    config: OrchestratorConfig,
    cache: GenerationCache,
    statuses: StatusIndex,
    quality: Mutex<QualityTally>,
}

#[derive(Default)]
struct QualityTally {
    total: f64,
    count: u64,
}

impl GenerationOrchestrator {
    pub fn new(generator: Arc<dyn DataGenerator>, config: OrchestratorConfig) -> Self {
        let cache = GenerationCache::new(config.max_cache_size, config.cache_ttl);
        Self {
            inner: Arc::new(Inner {
                generator,
                analyzer: None,
                config,
                cache,
                statuses: StatusIndex::new(),
                quality: Mutex::new(QualityTally::default()),
            }),
        }
    }

    pub fn with_analyzer(
        generator: Arc<dyn DataGenerator>,
        analyzer: Arc<dyn QualityAnalyzer>,
        config: OrchestratorConfig,
    ) -> Self {
        let cache = GenerationCache::new(config.max_cache_size, config.cache_ttl);
        Self {
            inner: Arc::new(Inner {
                generator,
                analyzer: Some(analyzer),
                config,
                cache,
                statuses: StatusIndex::new(),
                quality: Mutex::new(QualityTally::default()),
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Generate data for one request. Never fails: errors and panics become a
    /// result with `successful = false` and a `Generation failed: ...` message.
    pub async fn generate_test_data(&self, request: GenerationRequest) -> GeneratedDataResult {
        let generation_id = new_id("gen");
        let inner = &self.inner;
        inner.statuses.start(&generation_id, &request);

        info!(
            generation_id = %generation_id,
            request_id = %request.request_id,
            data_type = %request.data_type,
            scope = %request.generation_scope,
            records = request.record_count,
            "generation started"
        );

        let outcome = AssertUnwindSafe(self.run_generation(&generation_id, &request))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => self.failed_result(&generation_id, &request, &err),
            Err(panic) => {
                let err = GenerateError::Panicked(panic_message(panic));
                self.failed_result(&generation_id, &request, &err)
            }
        };

        if result.successful {
            let message = result.cache_hit.then(|| "served from cache".to_string());
            inner
                .statuses
                .complete(&generation_id, result.record_count(), message);
            info!(
                generation_id = %generation_id,
                records = result.record_count(),
                cache_hit = result.cache_hit,
                duration_ms = result.generation_time_ms,
                "generation completed"
            );
        } else {
            let message = result
                .error_message
                .clone()
                .unwrap_or_else(|| "Generation failed".to_string());
            warn!(generation_id = %generation_id, error = %message, "generation failed");
            inner.statuses.fail(&generation_id, message);
        }

        result
    }

    /// Adds `integrationType`, `contextData` and `enhanced: true` to the
    /// request context before generating.
    pub async fn generate_contextual_test_data(
        &self,
        mut request: GenerationRequest,
        integration_type: &str,
        context_data: Value,
    ) -> GeneratedDataResult {
        request
            .context
            .insert("integrationType".to_string(), Value::from(integration_type));
        request
            .context
            .insert("contextData".to_string(), context_data);
        request
            .context
            .insert("enhanced".to_string(), Value::Bool(true));
        self.generate_test_data(request).await
    }

    /// Tags the request with `testId` and `scenario = test_specific`.
    pub async fn generate_for_test(
        &self,
        test_id: &str,
        mut request: GenerationRequest,
    ) -> GeneratedDataResult {
        request
            .context
            .insert("testId".to_string(), Value::from(test_id));
        request
            .context
            .insert("scenario".to_string(), Value::from("test_specific"));
        self.generate_test_data(request).await
    }

    /// Run one request on its own tokio task.
    pub fn spawn_generation(&self, request: GenerationRequest) -> JoinHandle<GeneratedDataResult> {
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.generate_test_data(request).await })
    }

    /// Generate all requests concurrently. Results are in input order.
    pub async fn generate_bulk(&self, requests: Vec<GenerationRequest>) -> Vec<GeneratedDataResult> {
        info!(requests = requests.len(), "bulk generation started");

        let (request_ids, handles): (Vec<String>, Vec<_>) = requests
            .into_iter()
            .map(|request| (request.request_id.clone(), self.spawn_generation(request)))
            .unzip();

        let joined = join_all(handles).await;
        let results: Vec<GeneratedDataResult> = joined
            .into_iter()
            .zip(request_ids)
            .map(|(outcome, request_id)| match outcome {
                Ok(result) => result,
                Err(err) => {
                    let err = GenerateError::Join(err.to_string());
                    GeneratedDataResult::failure(request_id, format!("Generation failed: {err}"))
                }
            })
            .collect();

        let failed = results.iter().filter(|result| !result.successful).count();
        info!(
            results = results.len(),
            failed,
            "bulk generation completed"
        );
        results
    }

    pub fn get_generation_status(&self, generation_id: &str) -> Option<GenerationStatus> {
        self.inner.statuses.get(generation_id)
    }

    pub fn clear_cache(&self) {
        let size = self.inner.cache.len();
        self.inner.cache.clear();
        info!(entries = size, "generation cache cleared");
    }

    pub fn cache(&self) -> &GenerationCache {
        &self.inner.cache
    }

    pub fn service_statistics(&self) -> ServiceStatistics {
        let inner = &self.inner;
        let average_quality_score = match inner.quality.lock() {
            Ok(tally) if tally.count > 0 => tally.total / tally.count as f64,
            _ => 0.0,
        };

        ServiceStatistics {
            total_generations: inner.statuses.len(),
            active_generations: inner.statuses.running(),
            cache_size: inner.cache.len(),
            cache_hits: inner.cache.hits(),
            cache_misses: inner.cache.misses(),
            cache_hit_rate: inner.cache.hit_rate(),
            average_quality_score,
            healthy: inner.generator.is_healthy(),
            provider: inner.generator.provider().to_string(),
            model: inner.generator.model().to_string(),
        }
    }

    async fn run_generation(
        &self,
        generation_id: &str,
        request: &GenerationRequest,
    ) -> Result<GeneratedDataResult, GenerateError> {
        let inner = &self.inner;
        let signature = cache_signature(request);

        if inner.config.enable_caching {
            if let Some(mut cached) = inner.cache.get(&signature) {
                debug!(generation_id = %generation_id, signature = %signature, "cache hit");
                cached.generation_id = generation_id.to_string();
                cached.request_id = request.request_id.clone();
                cached.cache_hit = true;
                return Ok(cached);
            }
        }

        let start = Instant::now();
        let mut result = inner.generator.generate(request).await?;
        if !result.successful {
            let message = result
                .error_message
                .clone()
                .unwrap_or_else(|| "generator reported an unsuccessful result".to_string());
            return Err(GenerateError::GenerationFailure(message));
        }

        result.generation_id = generation_id.to_string();
        result.request_id = request.request_id.clone();
        result.generation_time_ms = start.elapsed().as_millis() as u64;
        result.cache_hit = false;
        if result.provider.is_empty() {
            result.provider = inner.generator.provider().to_string();
        }
        if result.model.is_empty() {
            result.model = inner.generator.model().to_string();
        }

        if request.enable_validation {
            if let Err(err) = self.enhance_with_validation(&mut result, request).await {
                warn!(generation_id = %generation_id, error = %err, "quality analysis degraded");
                result.add_warning(format!("Quality analysis failed: {err}"));
            }
        }

        if inner.config.enable_caching {
            inner.cache.insert(signature, result.clone());
        }

        Ok(result)
    }

    async fn enhance_with_validation(
        &self,
        result: &mut GeneratedDataResult,
        request: &GenerationRequest,
    ) -> Result<(), GenerateError> {
        let Some(analyzer) = self.inner.analyzer.as_ref() else {
            debug!(request_id = %request.request_id, "no quality analyzer configured");
            return Ok(());
        };

        let quality = analyzer.analyze_quality(result).await?;
        if let Ok(mut tally) = self.inner.quality.lock() {
            tally.total += quality.overall_score;
            tally.count += 1;
        }
        result.quality_report = Some(quality);

        if !request.validation_rules.is_empty() {
            let outcome = analyzer.validate(result, &request.validation_rules).await?;
            result.validation_result = Some(outcome);
        }
        Ok(())
    }

    fn failed_result(
        &self,
        generation_id: &str,
        request: &GenerationRequest,
        err: &GenerateError,
    ) -> GeneratedDataResult {
        let mut result = GeneratedDataResult::failure(
            request.request_id.clone(),
            format!("Generation failed: {err}"),
        );
        result.generation_id = generation_id.to_string();
        result.provider = self.inner.generator.provider().to_string();
        result.model = self.inner.generator.model().to_string();
        result
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during generation".to_string()
    }
}
