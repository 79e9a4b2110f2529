use async_trait::async_trait;
use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{Value, json};

use testweave_core::{
    DataRecord, GeneratedDataResult, GenerationRequest, QualityReport, ValidationOutcome,
};

use crate::capability::{DataGenerator, QualityAnalyzer};
use crate::errors::GenerateError;

const ECHOED_FIELDS: [&str; 2] = ["userId", "orderId"];

/// Deterministic local generator for offline runs and tests.
///
/// Records are `{id, index, generatedAt, score, active}` plus `userId` /
/// `orderId` echoed from the request context (or from the first record of a
/// dependency's generated data). The random columns depend only on the seed
/// and data type.
#[derive(Debug, Clone)]
pub struct SampleDataGenerator {
    seed: u64,
}

impl SampleDataGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for SampleDataGenerator {
    fn default() -> Self {
        Self::new(42)
    }
}

#[async_trait]
impl DataGenerator for SampleDataGenerator {
    fn provider(&self) -> &str {
        "local"
    }

    fn model(&self) -> &str {
        "sample-v1"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedDataResult, GenerateError> {
        if request.data_type.trim().is_empty() {
            return Err(GenerateError::GenerationFailure(
                "data type must not be empty".to_string(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(hash_seed(self.seed, &request.data_type));
        let generated_at = Utc::now().to_rfc3339();
        let echoed: Vec<(&str, Value)> = ECHOED_FIELDS
            .iter()
            .filter_map(|field| echoed_value(request, field).map(|value| (*field, value)))
            .collect();

        let mut records = Vec::with_capacity(request.record_count);
        for index in 0..request.record_count {
            let mut record = DataRecord::new();
            record.insert(
                "id".to_string(),
                json!(format!("{}_{}", request.data_type, index + 1)),
            );
            record.insert("index".to_string(), json!(index));
            record.insert("generatedAt".to_string(), json!(generated_at));
            record.insert("score".to_string(), json!(rng.random_range(0..=100)));
            record.insert("active".to_string(), json!(rng.random_bool(0.8)));
            for (field, value) in &echoed {
                record.insert((*field).to_string(), value.clone());
            }
            records.push(record);
        }

        Ok(GeneratedDataResult::success(
            request.request_id.clone(),
            records,
        ))
    }
}

fn echoed_value(request: &GenerationRequest, field: &str) -> Option<Value> {
    if let Some(value) = request.context.get(field) {
        return Some(value.clone());
    }
    request
        .context
        .get("dependencyContext")
        .and_then(|ctx| ctx.get("generatedData"))
        .and_then(|data| data.get(field))
        .and_then(|records| records.get(0))
        .and_then(|record| record.get("id"))
        .cloned()
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Quality analyzer based on field completeness.
///
/// The quality score is the share of non-null values across all record
/// fields. Each validation rule names a field that must be present and
/// non-null in every record.
#[derive(Debug, Clone, Default)]
pub struct CompletenessAnalyzer;

#[async_trait]
impl QualityAnalyzer for CompletenessAnalyzer {
    async fn analyze_quality(
        &self,
        result: &GeneratedDataResult,
    ) -> Result<QualityReport, GenerateError> {
        if result.data_records.is_empty() {
            return Err(GenerateError::ValidationDegraded(
                "no records to analyze".to_string(),
            ));
        }

        let mut total = 0usize;
        let mut filled = 0usize;
        let mut issues = Vec::new();
        for (idx, record) in result.data_records.iter().enumerate() {
            for (field, value) in record {
                total += 1;
                if value.is_null() {
                    issues.push(format!("record {idx}: field '{field}' is null"));
                } else {
                    filled += 1;
                }
            }
        }

        let completeness = if total == 0 {
            0.0
        } else {
            filled as f64 / total as f64 * 100.0
        };
        let mut report = QualityReport {
            overall_score: completeness,
            issues,
            ..QualityReport::default()
        };
        report.metrics.insert("completeness".to_string(), completeness);
        report
            .metrics
            .insert("records".to_string(), result.data_records.len() as f64);
        Ok(report)
    }

    async fn validate(
        &self,
        result: &GeneratedDataResult,
        rules: &[String],
    ) -> Result<ValidationOutcome, GenerateError> {
        let mut errors = Vec::new();
        let mut checks = 0usize;
        for rule in rules {
            for (idx, record) in result.data_records.iter().enumerate() {
                checks += 1;
                if record.get(rule).is_none_or(Value::is_null) {
                    errors.push(format!("record {idx}: '{rule}' is missing"));
                }
            }
        }

        let score = if checks == 0 {
            100.0
        } else {
            (checks - errors.len()) as f64 / checks as f64 * 100.0
        };
        Ok(ValidationOutcome {
            valid: errors.is_empty(),
            score,
            errors,
            applied_rules: rules.to_vec(),
        })
    }
}
