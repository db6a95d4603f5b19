//! Mock generators that record calls and return configurable text.

use crate::errors::GenerationError;
use crate::generate::Generator;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// A scripted generator for tests and demos.
///
/// Queued responses are returned first, in order; once the queue drains every
/// further call returns the default response. Each call's prompt is recorded.
/// A failure can be injected after a fixed number of successful calls, and an
/// artificial delay makes cancellation races reproducible.
#[derive(Debug, Default)]
pub struct MockGenerator {
    queue: Mutex<VecDeque<String>>,
    default_response: Mutex<String>,
    prompts: Mutex<Vec<String>>,
    fail_after: Mutex<Option<(usize, String)>>,
    delay: Mutex<Option<Duration>>,
}

impl MockGenerator {
    /// Creates a generator whose every response is empty text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator with a fixed default response.
    #[must_use]
    pub fn with_default_response(response: impl Into<String>) -> Self {
        let generator = Self::new();
        generator.set_default_response(response);
        generator
    }

    /// Sets the response returned once the queue is empty.
    pub fn set_default_response(&self, response: impl Into<String>) {
        *self.default_response.lock() = response.into();
    }

    /// Queues a one-shot response.
    pub fn push_response(&self, response: impl Into<String>) {
        self.queue.lock().push_back(response.into());
    }

    /// Fails every call after `calls` successful ones.
    pub fn fail_after(&self, calls: usize, reason: impl Into<String>) {
        *self.fail_after.lock() = Some((calls, reason.into()));
    }

    /// Adds an artificial delay to every call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Returns the number of generation calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Returns every prompt received, in call order.
    #[must_use]
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let call_index = {
            let mut prompts = self.prompts.lock();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };

        if let Some((calls, ref reason)) = *self.fail_after.lock() {
            if call_index >= calls {
                return Err(GenerationError::new(reason.clone()));
            }
        }

        Ok(self
            .queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_response.lock().clone()))
    }
}

/// A generator that always fails.
#[derive(Debug, Clone)]
pub struct FailingGenerator {
    reason: String,
}

impl FailingGenerator {
    /// Creates a generator failing with a reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::new(self.reason.clone()))
    }
}
