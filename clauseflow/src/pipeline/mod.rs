//! The orchestration engine.
//!
//! An [`AnalysisPipeline`] sequences registered stages against one shared
//! context: fixed order, gate predicates for conditional skipping, key-wise
//! context merging after each stage, and all-or-nothing failure containment.
//! A run is dominated by serialized waits on the generation service; the
//! pipeline does no parallelism across stages because later stages read
//! earlier stages' context keys.

mod builder;
mod gates;
mod result;
mod state;

#[cfg(test)]
mod integration_tests;

pub use builder::PipelineBuilder;
pub use gates::{Gate, GatePredicate};
pub use result::{PipelineResult, RunFailure};
pub use state::RunState;

use crate::cancel::CancelToken;
use crate::context::AnalysisContext;
use crate::errors::AnalysisError;
use crate::stage::{StageRegistry, StageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The pipeline orchestrator.
///
/// Holds the read-only stage registry, the fixed execution order and the gate
/// table. One pipeline instance may serve many concurrent runs; each run owns
/// its context and result exclusively.
#[derive(Debug)]
pub struct AnalysisPipeline {
    registry: Arc<StageRegistry>,
    order: Vec<String>,
    gates: Vec<Gate>,
}

impl AnalysisPipeline {
    pub(crate) fn from_parts(
        registry: Arc<StageRegistry>,
        order: Vec<String>,
        gates: Vec<Gate>,
    ) -> Self {
        Self {
            registry,
            order,
            gates,
        }
    }

    /// The fixed stage execution order.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// The stage registry backing this pipeline.
    #[must_use]
    pub fn registry(&self) -> &Arc<StageRegistry> {
        &self.registry
    }

    /// Runs the full pipeline over a document.
    ///
    /// # Errors
    ///
    /// Returns [`RunFailure`] when a stage's generation call fails; the
    /// failure names the stage and carries the partial results accumulated so
    /// far.
    pub async fn run(
        &self,
        document: &str,
        initial_context: Option<AnalysisContext>,
    ) -> Result<PipelineResult, RunFailure> {
        let token = CancelToken::new();
        self.run_with_token(document, initial_context, &token).await
    }

    /// Runs the full pipeline, checking a cancellation token between stages
    /// and racing it against the in-flight stage.
    ///
    /// # Errors
    ///
    /// Returns [`RunFailure`] on a stage failure or cancellation. A cancelled
    /// run discards the in-flight stage's partial work entirely.
    pub async fn run_with_token(
        &self,
        document: &str,
        initial_context: Option<AnalysisContext>,
        token: &CancelToken,
    ) -> Result<PipelineResult, RunFailure> {
        let start = Instant::now();
        let mut ctx = initial_context.unwrap_or_default();
        let mut results = PipelineResult::new();
        let mut state = RunState::Idle;

        info!(run_id = %results.run_id, stages = self.order.len(), "pipeline.started");

        for stage_id in &self.order {
            if token.is_cancelled() {
                warn!(stage = %stage_id, "pipeline.cancelled");
                return Err(fail(&mut state, stage_id, cancelled_error(token), results, start));
            }

            if let Some(gate) = self.gates.iter().find(|g| g.stage() == stage_id.as_str()) {
                if !gate.should_run(&ctx) {
                    info!(stage = %stage_id, reason = gate.description(), "stage.skipped");
                    continue;
                }
            }

            transition(&mut state, RunState::Running(stage_id.clone()));
            info!(stage = %stage_id, "stage.started");
            let stage_start = Instant::now();

            // The builder validated every order entry, so a miss here is a
            // wiring bug; it still surfaces as UnknownStage rather than a
            // panic.
            let stage = match self.registry.get(stage_id) {
                Ok(stage) => stage,
                Err(err) => return Err(fail(&mut state, stage_id, err, results, start)),
            };

            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => None,
                out = stage.process(document, &ctx) => Some(out),
            };

            let stage_duration_ms = to_millis(stage_start.elapsed());
            match outcome {
                None => {
                    warn!(stage = %stage_id, "pipeline.cancelled");
                    return Err(fail(&mut state, stage_id, cancelled_error(token), results, start));
                }
                Some(Err(source)) => {
                    warn!(
                        stage = %stage_id,
                        error = %source,
                        duration_ms = stage_duration_ms,
                        "stage.failed"
                    );
                    let cause = AnalysisError::generation(stage_id, source);
                    return Err(fail(&mut state, stage_id, cause, results, start));
                }
                Some(Ok(result)) => {
                    absorb(&mut ctx, &mut results, stage_id, result, stage_duration_ms);
                }
            }
        }

        transition(&mut state, RunState::Completed);
        results.duration_ms = to_millis(start.elapsed());
        info!(
            run_id = %results.run_id,
            duration_ms = results.duration_ms,
            stages = results.len(),
            "pipeline.completed"
        );
        Ok(results)
    }

    /// Runs the full pipeline with a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`RunFailure`] with a `Cancelled` cause when the deadline
    /// expires, or any other run failure.
    pub async fn run_with_timeout(
        &self,
        document: &str,
        initial_context: Option<AnalysisContext>,
        timeout: Duration,
    ) -> Result<PipelineResult, RunFailure> {
        let token = Arc::new(CancelToken::new());
        let watchdog_token = token.clone();
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            watchdog_token.cancel("run timed out");
        });

        let outcome = self.run_with_token(document, initial_context, &token).await;
        watchdog.abort();
        outcome
    }

    /// Runs a single stage in isolation.
    ///
    /// Gate predicates are not consulted and no other stage runs; the result
    /// is returned to the caller without being merged anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownStage`] for an unregistered id, or the
    /// stage's generation failure.
    pub async fn run_one(
        &self,
        stage_id: &str,
        document: &str,
        context: Option<&AnalysisContext>,
    ) -> Result<StageResult, AnalysisError> {
        let stage = self.registry.get(stage_id)?;
        let default_ctx = AnalysisContext::new();
        let ctx = context.unwrap_or(&default_ctx);

        info!(stage = %stage_id, "stage.started");
        let start = Instant::now();
        let result = stage
            .process(document, ctx)
            .await
            .map_err(|source| AnalysisError::generation(stage_id, source))?;
        info!(stage = %stage_id, duration_ms = to_millis(start.elapsed()), "stage.completed");
        Ok(result)
    }
}

/// Advances the run-state machine, asserting transition legality in debug
/// builds.
fn transition(state: &mut RunState, next: RunState) {
    debug_assert!(
        state.can_transition_to(&next),
        "illegal run-state transition: {state} -> {next}"
    );
    debug!(from = %state, to = %next, "run.state");
    *state = next;
}

/// Merges a completed stage result into the context and records it.
fn absorb(
    ctx: &mut AnalysisContext,
    results: &mut PipelineResult,
    stage_id: &str,
    result: StageResult,
    duration_ms: f64,
) {
    if result.is_complete() {
        ctx.merge(result.data());
        info!(stage = %stage_id, duration_ms, keys = result.data().len(), "stage.completed");
    } else {
        // Stage-local condition: recorded, but nothing merged.
        debug!(
            stage = %stage_id,
            missing = result.missing_key().unwrap_or_default(),
            "stage completed without required input"
        );
    }
    results.record(stage_id, result);
}

fn fail(
    state: &mut RunState,
    stage_id: &str,
    cause: AnalysisError,
    mut partial: PipelineResult,
    start: Instant,
) -> RunFailure {
    transition(state, RunState::Failed);
    partial.duration_ms = to_millis(start.elapsed());
    RunFailure {
        stage: stage_id.to_string(),
        cause,
        partial,
    }
}

fn cancelled_error(token: &CancelToken) -> AnalysisError {
    AnalysisError::Cancelled(token.reason().unwrap_or_else(|| "cancelled".to_string()))
}

fn to_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
