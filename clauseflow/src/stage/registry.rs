//! Registry mapping stage identifiers to stage instances.

use super::Stage;
use crate::errors::AnalysisError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A mapping from stage identifier to stage instance.
///
/// Populated once at startup and read-only during runs, so a single registry
/// may be shared safely across concurrent runs. It decouples the
/// orchestrator's fixed execution order from concrete stage construction.
#[derive(Default)]
pub struct StageRegistry {
    stages: RwLock<HashMap<String, Arc<dyn Stage>>>,
}

impl StageRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stage under its own identifier.
    ///
    /// Re-registering an identifier replaces the previous instance.
    pub fn register(&self, stage: Arc<dyn Stage>) {
        let id = stage.id().to_string();
        self.stages.write().insert(id, stage);
    }

    /// Gets a stage by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownStage`] when the identifier is not
    /// registered.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Stage>, AnalysisError> {
        self.stages
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AnalysisError::UnknownStage(id.to_string()))
    }

    /// Checks whether an identifier is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.stages.read().contains_key(id)
    }

    /// Lists registered identifiers, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.stages.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.read().len()
    }

    /// Returns true if no stages are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.read().is_empty()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stages", &self.ids())
            .finish()
    }
}
