//! Run results and run failures.

use crate::errors::AnalysisError;
use crate::stage::StageResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The accumulated results of one pipeline run.
///
/// Maps each stage identifier to that stage's result, in execution order.
/// Skipped stages contribute no entry. Append-only during a run, immutable
/// once returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Per-stage results.
    results: HashMap<String, StageResult>,
    /// Identifiers of the stages that ran, in execution order.
    completed: Vec<String>,
    /// Total run duration in milliseconds; set when the run finishes.
    #[serde(default)]
    pub duration_ms: f64,
}

impl PipelineResult {
    /// Creates an empty result for a new run.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            results: HashMap::new(),
            completed: Vec::new(),
            duration_ms: 0.0,
        }
    }

    /// Records a stage's result. Called once per executed stage.
    pub(crate) fn record(&mut self, stage: impl Into<String>, result: StageResult) {
        let stage = stage.into();
        self.completed.push(stage.clone());
        self.results.insert(stage, result);
    }

    /// Gets a stage's result.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<&StageResult> {
        self.results.get(stage)
    }

    /// Checks whether a stage contributed a result.
    #[must_use]
    pub fn contains(&self, stage: &str) -> bool {
        self.results.contains_key(stage)
    }

    /// The stages that ran, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[String] {
        &self.completed
    }

    /// Returns the number of recorded stage results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if no stage has reported yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl Default for PipelineResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A failed run: which stage failed, why, and everything accumulated before
/// the failure.
///
/// Nothing from the failed stage is part of `partial` - a stage's
/// contribution is all-or-nothing.
#[derive(Debug)]
pub struct RunFailure {
    /// The stage that failed.
    pub stage: String,
    /// The failure cause.
    pub cause: AnalysisError,
    /// Results of the stages that completed before the failure.
    pub partial: PipelineResult,
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pipeline failed at stage '{}' after {} completed stage(s): {}",
            self.stage,
            self.partial.len(),
            self.cause
        )
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
