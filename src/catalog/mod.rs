//! Workflow catalog
//!
//! A catalog is the immutable set of workflows the engine can simulate.
//! The built-in catalog ships with the binary; operators can load their own
//! from YAML or TOML.

pub mod builtin;
pub mod loader;
pub mod model;

pub use builtin::{builtin_catalog, builtin_catalog_at};
pub use loader::{load_catalog, parse_catalog, CatalogFormat};
pub use model::{
    FieldDescriptor, FieldKind, InfoBox, InfoKind, Language, LocalizedText, Scenario, Step, Workflow,
};

use crate::errors::ValidationError;

/// Ordered, read-only collection of workflows
#[derive(Debug, Clone)]
pub struct Catalog {
    workflows: Vec<Workflow>,
}

impl Catalog {
    /// Wrap workflows that are known to be well formed
    pub(crate) fn from_trusted(workflows: Vec<Workflow>) -> Self {
        Self { workflows }
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn get(&self, id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id == id)
    }

    /// Look up a workflow, failing with a validation error when absent
    pub fn require(&self, id: &str) -> Result<&Workflow, ValidationError> {
        self.get(id).ok_or_else(|| ValidationError::UnknownWorkflow(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}
