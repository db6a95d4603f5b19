//! # Clauseflow
//!
//! A staged contract-analysis pipeline engine.
//!
//! Clauseflow coordinates a fixed sequence of specialized text-analysis
//! stages over a single document, accumulating each stage's findings into a
//! shared context that later stages consume:
//!
//! - **Stage-based execution**: seven analysis stages in a fixed order, with
//!   gate predicates for conditional skipping
//! - **Context accumulation**: key-wise merge of every stage's findings,
//!   visible to all downstream stages
//! - **Lenient response parsing**: one record parser and one keyword router
//!   shared by every stage
//! - **Failure containment**: all-or-nothing stage results, partial run
//!   results on abort
//! - **Cancellation handling**: token- and deadline-based cancellation that
//!   aborts in-flight generation calls
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clauseflow::prelude::*;
//! use std::sync::Arc;
//!
//! let generator = Arc::new(HttpGenerator::new(GeneratorConfig::new(
//!     "http://localhost:11434",
//!     "llama3",
//! ))?);
//! let pipeline = standard_pipeline(
//!     generator,
//!     Arc::new(TemplateStore::load_dir("data/clause_templates")?),
//!     Arc::new(TemplateStore::load_dir("data/compliance_rules")?),
//! )?;
//!
//! let result = pipeline.run(&document_text, None).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancel;
pub mod context;
pub mod errors;
pub mod generate;
pub mod parse;
pub mod pipeline;
pub mod stage;
pub mod stages;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::context::AnalysisContext;
    pub use crate::errors::{AnalysisError, GenerationError, PipelineValidationError};
    pub use crate::generate::Generator;
    #[cfg(feature = "http")]
    pub use crate::generate::{GeneratorConfig, HttpGenerator};
    pub use crate::parse::{parse_records, KeywordRouter, Record};
    pub use crate::pipeline::{
        AnalysisPipeline, Gate, PipelineBuilder, PipelineResult, RunFailure, RunState,
    };
    pub use crate::stage::{Stage, StageData, StageRegistry, StageResult};
    pub use crate::stages::standard_pipeline;
    pub use crate::store::{Template, TemplateStore};
}
