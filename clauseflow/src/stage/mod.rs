//! The stage abstraction.
//!
//! Stages are the units of analysis in a clauseflow pipeline. Each stage
//! reads the document text plus the accumulated context, calls the generation
//! service zero or more times, parses each raw response, and returns a
//! partial result map. Stages never mutate the context they are given -
//! merging is the orchestrator's job.

mod registry;

pub use registry::StageRegistry;

use crate::context::AnalysisContext;
use crate::errors::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

/// Partial result data produced by a stage, merged verbatim into the context.
pub type StageData = HashMap<String, serde_json::Value>;

/// The outcome of one stage execution.
///
/// Either a completed map of findings, or an explicit marker naming a
/// required context key the stage found absent. Missing input is a
/// stage-local condition, not a run-aborting failure: the orchestrator
/// records it but merges nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Findings keyed by result name.
    #[serde(default)]
    data: StageData,
    /// The context key the stage required and did not find, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    missing_input: Option<String>,
}

impl StageResult {
    /// Creates a completed result from findings.
    #[must_use]
    pub fn complete(data: StageData) -> Self {
        Self {
            data,
            missing_input: None,
        }
    }

    /// Creates a missing-input result naming the absent context key.
    #[must_use]
    pub fn missing_input(key: impl Into<String>) -> Self {
        Self {
            data: StageData::new(),
            missing_input: Some(key.into()),
        }
    }

    /// Returns true if the stage completed with findings to merge.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_input.is_none()
    }

    /// Returns the absent context key, if this is a missing-input result.
    #[must_use]
    pub fn missing_key(&self) -> Option<&str> {
        self.missing_input.as_deref()
    }

    /// Returns the findings.
    #[must_use]
    pub fn data(&self) -> &StageData {
        &self.data
    }

    /// Gets a single finding.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Consumes the result, returning the findings.
    #[must_use]
    pub fn into_data(self) -> StageData {
        self.data
    }
}

/// A unit of analysis in the pipeline.
///
/// Concrete stages differ only in their prompt templates, their
/// keyword-to-bucket routing table, and the context keys they require.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the stage identifier used in pipeline order, gates and
    /// results.
    fn id(&self) -> &str;

    /// Analyzes the document against the accumulated context.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] when a generation call fails; the
    /// orchestrator attaches the stage identifier and aborts the run.
    async fn process(
        &self,
        document: &str,
        ctx: &AnalysisContext,
    ) -> Result<StageResult, GenerationError>;
}
