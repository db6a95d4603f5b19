//! Template and rule storage.
//!
//! Clause templates and compliance rules are both JSON documents keyed by
//! file stem, loaded once at startup. Candidate selection matches a detected
//! clause-type label against entry identifiers by bidirectional
//! case-insensitive substring containment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// One stored template or rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Identifier (the source file stem).
    #[serde(skip)]
    pub id: String,
    /// The reference text of the template.
    #[serde(default)]
    pub text: String,
    /// Any further fields from the source document.
    #[serde(flatten)]
    pub meta: HashMap<String, serde_json::Value>,
}

impl Template {
    /// Creates a template with an id and reference text.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            meta: HashMap::new(),
        }
    }
}

/// A store of templates or rules, keyed by lowercase identifier.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    entries: HashMap<String, Template>,
}

impl TemplateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` file in a directory.
    ///
    /// Malformed files are logged and skipped; only the directory walk itself
    /// can fail.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the directory cannot be read.
    pub fn load_dir(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let mut store = Self::new();

        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str::<Template>(&raw).map_err(|e| e.to_string()))
            {
                Ok(mut template) => {
                    template.id = stem.to_string();
                    store.insert(template);
                }
                Err(error) => {
                    warn!(file = %path.display(), %error, "skipping malformed template file");
                }
            }
        }

        Ok(store)
    }

    /// Inserts a template, keyed by its lowercased id.
    pub fn insert(&mut self, template: Template) {
        self.entries.insert(template.id.to_lowercase(), template);
    }

    /// Gets an entry by identifier, case-insensitively.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.entries.get(&id.to_lowercase())
    }

    /// Finds candidate templates for a clause-type label.
    ///
    /// A template is a candidate when its identifier contains the label or
    /// the label contains the identifier (case-insensitive). An empty label
    /// matches nothing. Candidates are returned in identifier order so
    /// selection is deterministic.
    #[must_use]
    pub fn candidates(&self, label: &str) -> Vec<&Template> {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<&Template> = self
            .entries
            .iter()
            .filter(|(id, _)| id.contains(&label) || label.contains(id.as_str()))
            .map(|(_, template)| template)
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    /// Lists identifiers, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.values().map(|t| t.id.clone()).collect();
        ids.sort();
        ids
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
