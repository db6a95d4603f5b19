//! Gate predicates for conditional stage execution.

use crate::context::AnalysisContext;
use std::sync::Arc;

/// The predicate function evaluated against the current context.
pub type GatePredicate = Arc<dyn Fn(&AnalysisContext) -> bool + Send + Sync>;

/// A condition evaluated before a stage to decide whether it runs.
///
/// When the predicate returns false the stage is skipped entirely: it
/// contributes no pipeline-result entry and does not touch the context.
/// Gates apply only to full runs; `run_one` never consults them.
#[derive(Clone)]
pub struct Gate {
    stage: String,
    description: String,
    predicate: GatePredicate,
}

impl Gate {
    /// Creates a gate for a stage from a predicate.
    pub fn new(
        stage: impl Into<String>,
        description: impl Into<String>,
        predicate: impl Fn(&AnalysisContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            stage: stage.into(),
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// A gate that runs the stage only when a context key holds a non-empty
    /// array.
    pub fn require_non_empty_array(stage: impl Into<String>, key: impl Into<String>) -> Self {
        let stage = stage.into();
        let key = key.into();
        let description = format!("requires non-empty '{key}'");
        Self::new(stage, description, move |ctx| {
            ctx.get_array(&key).is_some_and(|items| !items.is_empty())
        })
    }

    /// The stage this gate guards.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Human-readable description, used in skip logs.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Evaluates the gate against the current context.
    #[must_use]
    pub fn should_run(&self, ctx: &AnalysisContext) -> bool {
        (self.predicate)(ctx)
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("stage", &self.stage)
            .field("description", &self.description)
            .finish()
    }
}
