//! Pipeline construction and validation.

use super::{AnalysisPipeline, Gate};
use crate::errors::PipelineValidationError;
use crate::stage::{Stage, StageRegistry};
use std::collections::HashSet;
use std::sync::Arc;

/// Builds an [`AnalysisPipeline`] from stages and gates.
///
/// Stage order is insertion order. `build` validates that the pipeline is
/// non-empty, that no stage identifier repeats, and that every gate names a
/// registered stage.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
    gates: Vec<Gate>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage; its position fixes its place in the execution order.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Adds a gate predicate for a stage.
    #[must_use]
    pub fn gate(mut self, gate: Gate) -> Self {
        self.gates.push(gate);
        self
    }

    /// Validates and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineValidationError`] on an empty pipeline, a duplicate
    /// stage identifier, or a gate naming an unknown stage.
    pub fn build(self) -> Result<AnalysisPipeline, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::Empty);
        }

        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(self.stages.len());
        let registry = StageRegistry::new();

        for stage in self.stages {
            let id = stage.id().to_string();
            if !seen.insert(id.clone()) {
                return Err(PipelineValidationError::DuplicateStage(id));
            }
            order.push(id);
            registry.register(stage);
        }

        for gate in &self.gates {
            if !seen.contains(gate.stage()) {
                return Err(PipelineValidationError::UnknownGateStage(
                    gate.stage().to_string(),
                ));
            }
        }

        Ok(AnalysisPipeline::from_parts(
            Arc::new(registry),
            order,
            self.gates,
        ))
    }
}
