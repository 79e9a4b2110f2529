use async_trait::async_trait;

use testweave_core::{GeneratedDataResult, GenerationRequest, QualityReport, ValidationOutcome};

use crate::errors::GenerateError;

/// Capability that turns a request into generated records (an LLM client,
/// a local generator, a fixture loader).
#[async_trait]
pub trait DataGenerator: Send + Sync {
    /// Provider identifier recorded on results (ex.: `openrouter`, `local`).
    fn provider(&self) -> &str;

    /// Model identifier recorded on results.
    fn model(&self) -> &str;

    fn is_healthy(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedDataResult, GenerateError>;
}

/// Optional enrichment run on successful results when validation is requested.
#[async_trait]
pub trait QualityAnalyzer: Send + Sync {
    async fn analyze_quality(
        &self,
        result: &GeneratedDataResult,
    ) -> Result<QualityReport, GenerateError>;

    async fn validate(
        &self,
        result: &GeneratedDataResult,
        rules: &[String],
    ) -> Result<ValidationOutcome, GenerateError>;
}
