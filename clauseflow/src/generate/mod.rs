//! The external text-generation boundary.
//!
//! Stages are generic over [`Generator`]; the core makes no assumption about
//! the backing service beyond "prompt in, free-form text out, may fail". No
//! retry policy lives here - retries, if desired, belong to the caller.

use crate::errors::GenerationError;
use async_trait::async_trait;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{GeneratorConfig, HttpGenerator};

/// An opaque text-generation capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generates free-form text for a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] when the backing service fails (network,
    /// quota, malformed prompt feedback).
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
