//! The concrete analysis stages and the standard pipeline assembly.
//!
//! Every stage follows the same shape: build prompts from the document and
//! the accumulated context, run each raw response through the record parser,
//! and route parsed labels into named buckets with a per-stage
//! [`KeywordRouter`](crate::parse::KeywordRouter) table. What differs between
//! stages is only the prompts, the routing table, and the context keys they
//! require.

mod clause;
mod compliance;
mod inconsistency;
mod review;
mod risk;
mod suggestion;
mod summary;

pub use clause::ClauseStage;
pub use compliance::ComplianceStage;
pub use inconsistency::InconsistencyStage;
pub use review::ReviewStage;
pub use risk::RiskStage;
pub use suggestion::SuggestionStage;
pub use summary::SummaryStage;

use crate::errors::PipelineValidationError;
use crate::generate::Generator;
use crate::parse::{BucketMap, Record};
use crate::pipeline::{AnalysisPipeline, Gate, PipelineBuilder};
use crate::store::TemplateStore;
use std::sync::Arc;

/// Builds the standard seven-stage contract-analysis pipeline.
///
/// Order: review, risk, clause, suggestion, inconsistency, compliance,
/// summary. The suggestion stage is gated on upstream risk findings: it is
/// skipped when the context holds no risky clauses.
///
/// # Errors
///
/// Returns [`PipelineValidationError`] if assembly is misconfigured; with the
/// fixed stage set here that indicates a programming error.
pub fn standard_pipeline(
    generator: Arc<dyn Generator>,
    templates: Arc<TemplateStore>,
    rules: Arc<TemplateStore>,
) -> Result<AnalysisPipeline, PipelineValidationError> {
    PipelineBuilder::new()
        .stage(Arc::new(ReviewStage::new(generator.clone())))
        .stage(Arc::new(RiskStage::new(generator.clone())))
        .stage(Arc::new(ClauseStage::new(generator.clone(), templates)))
        .stage(Arc::new(SuggestionStage::new(generator.clone())))
        .stage(Arc::new(InconsistencyStage::new(generator.clone())))
        .stage(Arc::new(ComplianceStage::new(generator.clone(), rules)))
        .stage(Arc::new(SummaryStage::new(generator)))
        .gate(Gate::require_non_empty_array(
            SuggestionStage::ID,
            "risky_clauses",
        ))
        .build()
}

/// Serializes parsed records as a JSON array of objects.
pub(crate) fn records_to_json(records: &[Record]) -> serde_json::Value {
    serde_json::Value::Array(records.iter().map(Record::to_json).collect())
}

/// Flattens every field of every record into one JSON object.
///
/// Later fields overwrite earlier ones with the same label, matching how a
/// single free-form analysis response collapses into one finding.
pub(crate) fn flatten_fields(records: &[Record]) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    for record in records {
        for (label, value) in record.iter() {
            map.insert(label.to_string(), serde_json::Value::String(value.to_string()));
        }
    }
    map
}

/// Takes a bucket as a JSON array, defaulting to empty.
pub(crate) fn bucket_list(buckets: &mut BucketMap, name: &str) -> serde_json::Value {
    serde_json::Value::Array(
        buckets
            .remove(name)
            .unwrap_or_default()
            .into_iter()
            .map(serde_json::Value::String)
            .collect(),
    )
}

/// Takes the first value of a bucket as a JSON string, defaulting to empty.
pub(crate) fn bucket_first(buckets: &mut BucketMap, name: &str) -> serde_json::Value {
    serde_json::Value::String(
        buckets
            .remove(name)
            .and_then(|mut values| if values.is_empty() { None } else { Some(values.remove(0)) })
            .unwrap_or_default(),
    )
}

/// Reads a string field out of a JSON object, defaulting to empty.
pub(crate) fn field<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value.get(key).and_then(serde_json::Value::as_str).unwrap_or("")
}
