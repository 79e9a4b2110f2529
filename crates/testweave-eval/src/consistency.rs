use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::Value;

use testweave_core::DataRecord;

use crate::expression::{as_number, is_match, value_text};
use crate::model::{ConsistencySummary, RecordConsistency};
use crate::rules::EMAIL;

const MISSING_ID_PENALTY: f64 = 20.0;
const INVALID_EMAIL_PENALTY: f64 = 10.0;
const AGE_MISMATCH_PENALTY: f64 = 15.0;
const INTER_RECORD_BASE_SCORE: f64 = 95.0;
const DUPLICATE_ID_PENALTY: f64 = 20.0;

/// Intra-record checks: `id` present, `email` well formed, `age` within one
/// year of `birthDate` as of `reference_date`.
pub fn check_record_consistency(
    record_index: usize,
    record: &DataRecord,
    reference_date: NaiveDate,
) -> RecordConsistency {
    let mut score: f64 = 100.0;
    let mut issues = Vec::new();

    let record_id = record.get("id").filter(|id| !id.is_null()).cloned();
    if record_id.is_none() {
        issues.push("Missing required field: id".to_string());
        score -= MISSING_ID_PENALTY;
    }

    if let Some(email) = record.get("email").filter(|email| !email.is_null()) {
        let valid = email.as_str().is_some_and(|text| is_match(&EMAIL, text));
        if !valid {
            issues.push("Invalid email format".to_string());
            score -= INVALID_EMAIL_PENALTY;
        }
    }

    let age = record.get("age").and_then(as_number);
    let birth_date = record
        .get("birthDate")
        .and_then(Value::as_str)
        .and_then(parse_date);
    if let (Some(age), Some(birth_date)) = (age, birth_date) {
        let calculated = f64::from(reference_date.year() - birth_date.year());
        if (age - calculated).abs() > 1.0 {
            issues.push("Age and birth date are inconsistent".to_string());
            score -= AGE_MISMATCH_PENALTY;
        }
    }

    RecordConsistency {
        record_index,
        record_id,
        consistency_score: score.max(0.0),
        consistency_issues: issues,
    }
}

/// Duplicate `id` values across records, in first-duplicate order.
pub fn duplicate_ids(records: &[DataRecord]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut duplicates = Vec::new();
    for id in records
        .iter()
        .filter_map(|record| record.get("id"))
        .filter(|id| !id.is_null())
        .map(value_text)
    {
        if !seen.insert(id.clone()) && !duplicates.contains(&id) {
            duplicates.push(id);
        }
    }
    duplicates
}

/// Inter-record score and issues.
pub fn check_inter_record_consistency(records: &[DataRecord]) -> (f64, Vec<String>) {
    let duplicates = duplicate_ids(records);
    if duplicates.is_empty() {
        return (INTER_RECORD_BASE_SCORE, Vec::new());
    }
    (
        INTER_RECORD_BASE_SCORE - DUPLICATE_ID_PENALTY,
        vec![format!("Duplicate IDs found: [{}]", duplicates.join(", "))],
    )
}

/// Mean of the average per-record score (100 with no records) and the
/// inter-record score.
pub fn summarize(details: &[RecordConsistency], inter_record_score: f64) -> ConsistencySummary {
    let internal = if details.is_empty() {
        100.0
    } else {
        details.iter().map(|detail| detail.consistency_score).sum::<f64>() / details.len() as f64
    };
    ConsistencySummary {
        total_records: details.len(),
        internal_consistency_score: internal,
        inter_record_consistency_score: inter_record_score,
        consistency_score: (internal + inter_record_score) / 2.0,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}
