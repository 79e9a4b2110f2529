use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use testweave_core::GenerationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationState {
    Started,
    Completed,
    Failed,
}

/// Progress record for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub generation_id: String,
    pub status: GenerationState,
    pub request_id: String,
    pub data_type: String,
    pub record_count: usize,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GenerationStatus {
    pub fn is_completed(&self) -> bool {
        self.status == GenerationState::Completed
    }

    pub fn is_running(&self) -> bool {
        self.status == GenerationState::Started
    }
}

/// Process-lifetime index of generation statuses; entries are never removed.
#[derive(Debug, Default)]
pub struct StatusIndex {
    statuses: DashMap<String, GenerationStatus>,
}

impl StatusIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, generation_id: &str, request: &GenerationRequest) {
        self.statuses.insert(
            generation_id.to_string(),
            GenerationStatus {
                generation_id: generation_id.to_string(),
                status: GenerationState::Started,
                request_id: request.request_id.clone(),
                data_type: request.data_type.clone(),
                record_count: request.record_count,
                started_at: Utc::now(),
                completed_at: None,
                message: None,
            },
        );
    }

    pub fn complete(&self, generation_id: &str, record_count: usize, message: Option<String>) {
        self.finish(generation_id, GenerationState::Completed, Some(record_count), message);
    }

    pub fn fail(&self, generation_id: &str, message: impl Into<String>) {
        self.finish(generation_id, GenerationState::Failed, None, Some(message.into()));
    }

    pub fn get(&self, generation_id: &str) -> Option<GenerationStatus> {
        self.statuses
            .get(generation_id)
            .map(|status| status.value().clone())
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn running(&self) -> usize {
        self.statuses
            .iter()
            .filter(|status| status.value().is_running())
            .count()
    }

    fn finish(
        &self,
        generation_id: &str,
        state: GenerationState,
        record_count: Option<usize>,
        message: Option<String>,
    ) {
        if let Some(mut status) = self.statuses.get_mut(generation_id) {
            status.status = state;
            status.completed_at = Some(Utc::now());
            if let Some(count) = record_count {
                status.record_count = count;
            }
            if message.is_some() {
                status.message = message;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_keeps_start_time() {
        let index = StatusIndex::new();
        let request = GenerationRequest::new("user").with_record_count(5);
        index.start("gen_1", &request);

        let started = index.get("gen_1").expect("status");
        assert!(started.is_running());
        assert_eq!(index.running(), 1);

        index.complete("gen_1", 3, None);
        let done = index.get("gen_1").expect("status");
        assert!(done.is_completed());
        assert_eq!(done.started_at, started.started_at);
        assert!(done.completed_at.is_some());
        assert_eq!(done.record_count, 3);
        assert_eq!(index.running(), 0);
    }

    #[test]
    fn failure_records_message() {
        let index = StatusIndex::new();
        index.start("gen_2", &GenerationRequest::new("order"));
        index.fail("gen_2", "Generation failed: boom");

        let status = index.get("gen_2").expect("status");
        assert_eq!(status.status, GenerationState::Failed);
        assert_eq!(status.message.as_deref(), Some("Generation failed: boom"));
        assert!(index.get("missing").is_none());
    }
}
