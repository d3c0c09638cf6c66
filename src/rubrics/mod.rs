use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::models::Criterion;

/// Read-only store of the default scoring rubric.
///
/// Loaded once at process start and shared across request tasks; never
/// mutated afterwards.
#[derive(Clone)]
pub struct RubricStore {
    criteria: Arc<Vec<Criterion>>,
}

impl RubricStore {
    /// Load the default rubric from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rubrics file {}", path.display()))?;

        let criteria: Vec<Criterion> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse rubrics file {}", path.display()))?;

        if criteria.is_empty() {
            anyhow::bail!("Rubrics file {} contains no criteria", path.display());
        }

        Ok(Self {
            criteria: Arc::new(criteria),
        })
    }

    /// Build a store from in-memory criteria.
    pub fn new(criteria: Vec<Criterion>) -> Self {
        Self {
            criteria: Arc::new(criteria),
        }
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }
}
