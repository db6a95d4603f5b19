//! The shared analysis context accumulated across a pipeline run.

use crate::stage::StageData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The accumulated findings of all stages that have run so far.
///
/// A context is created empty at the start of a run, grows monotonically as
/// the orchestrator merges each stage's result into it, and is discarded at
/// run end. Keys written by one stage are visible, unmodified, to every
/// subsequent stage unless a later stage writes the same key - merges are
/// key-wise unions with overwrite on collision.
///
/// The context is exclusively owned by one run. Stages receive a shared
/// reference and never mutate it; merging is the orchestrator's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisContext {
    data: HashMap<String, serde_json::Value>,
}

impl AnalysisContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context from existing data.
    #[must_use]
    pub fn from_data(data: HashMap<String, serde_json::Value>) -> Self {
        Self { data }
    }

    /// Gets a value from the context.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Gets a value as an array slice, if it is one.
    #[must_use]
    pub fn get_array(&self, key: &str) -> Option<&[serde_json::Value]> {
        self.data.get(key).and_then(|v| v.as_array()).map(Vec::as_slice)
    }

    /// Sets a single value, overwriting any existing value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Merges a stage's data into the context.
    ///
    /// Key-wise union: a key present in both the context and the incoming
    /// data is overwritten by the incoming value.
    pub fn merge(&mut self, data: &StageData) {
        for (key, value) in data {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// Returns a copy of all data.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        self.data.clone()
    }

    /// Renders the context as pretty JSON for inclusion in prompts.
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.data).unwrap_or_else(|_| "{}".to_string())
    }

    /// Returns all keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
