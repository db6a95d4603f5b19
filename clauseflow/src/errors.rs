//! Error types for the clauseflow pipeline engine.
//!
//! The taxonomy distinguishes failures that abort a run (generation failures,
//! cancellation) from request-level mistakes (unknown stage ids) and from
//! build-time misconfiguration. Parsing degradation is never an error: the
//! record parser absorbs malformed generated text by producing fewer records.

use thiserror::Error;

/// Failure of a single call to the external generation service.
///
/// The core does not retry; the failure is surfaced to the orchestrator with
/// the identifier of the stage that issued the call.
#[derive(Debug, Clone, Error)]
#[error("generation failed: {reason}")]
pub struct GenerationError {
    /// What went wrong, as reported by the generation backend.
    pub reason: String,
}

impl GenerationError {
    /// Creates a new generation error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A stage's generation call failed; the stage identifier is attached by
    /// the orchestrator.
    #[error("stage '{stage}' failed: {source}")]
    Generation {
        /// The stage that issued the failing call.
        stage: String,
        /// The underlying generation failure.
        #[source]
        source: GenerationError,
    },

    /// A caller requested a stage identifier that is not registered.
    #[error("unknown stage: '{0}'")]
    UnknownStage(String),

    /// The run was aborted by a cancellation token or timeout.
    #[error("run cancelled: {0}")]
    Cancelled(String),
}

impl AnalysisError {
    /// Wraps a generation failure with the stage that produced it.
    #[must_use]
    pub fn generation(stage: impl Into<String>, source: GenerationError) -> Self {
        Self::Generation {
            stage: stage.into(),
            source,
        }
    }

    /// Returns true if this error is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Error raised when pipeline construction is misconfigured.
#[derive(Debug, Clone, Error)]
pub enum PipelineValidationError {
    /// A pipeline must contain at least one stage.
    #[error("pipeline contains no stages")]
    Empty,

    /// The same stage identifier was registered twice.
    #[error("duplicate stage id: '{0}'")]
    DuplicateStage(String),

    /// A gate references a stage that is not part of the pipeline.
    #[error("gate references unknown stage: '{0}'")]
    UnknownGateStage(String),
}
