//! Loading operator-supplied catalogs from YAML or TOML files

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::model::{FieldKind, Workflow};
use super::Catalog;
use crate::engine::path::FieldPath;
use crate::errors::{FlowsimError, Result};

/// Maximum catalog file size (1MB)
const MAX_CATALOG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Yaml,
    Toml,
    /// Try YAML first, then TOML
    Auto,
}

impl CatalogFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref() {
            Some("yaml") | Some("yml") => CatalogFormat::Yaml,
            Some("toml") => CatalogFormat::Toml,
            _ => CatalogFormat::Auto,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    workflows: Vec<Workflow>,
}

/// Load and validate a catalog file
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let file_size = fs::metadata(path)?.len();
    if file_size > MAX_CATALOG_FILE_SIZE {
        return Err(FlowsimError::Catalog(format!(
            "Catalog file too large: {} bytes (max {} bytes)",
            file_size, MAX_CATALOG_FILE_SIZE
        )));
    }

    let content = fs::read_to_string(path)?;
    parse_catalog(&content, CatalogFormat::from_path(path))
}

/// Parse and validate catalog text
pub fn parse_catalog(content: &str, format: CatalogFormat) -> Result<Catalog> {
    let file: CatalogFile = match format {
        CatalogFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| FlowsimError::Catalog(format!("Failed to parse YAML catalog: {}", e)))?,
        CatalogFormat::Toml => toml::from_str(content)
            .map_err(|e| FlowsimError::Catalog(format!("Failed to parse TOML catalog: {}", e)))?,
        CatalogFormat::Auto => serde_yaml::from_str(content).or_else(|_| {
            toml::from_str(content)
                .map_err(|e| FlowsimError::Catalog(format!("Failed to parse catalog: {}", e)))
        })?,
    };

    validate_catalog(&file.workflows)?;
    Ok(Catalog::from_trusted(file.workflows))
}

fn validate_catalog(workflows: &[Workflow]) -> Result<()> {
    if workflows.is_empty() {
        return Err(FlowsimError::Catalog("Catalog must define at least one workflow".to_string()));
    }

    let mut seen = HashSet::new();
    for workflow in workflows {
        if workflow.id.is_empty() {
            return Err(FlowsimError::Catalog("Every workflow must have an id".to_string()));
        }
        if !seen.insert(workflow.id.as_str()) {
            return Err(FlowsimError::Catalog(format!("Duplicate workflow id '{}'", workflow.id)));
        }
        validate_workflow(workflow)?;
    }
    Ok(())
}

fn validate_workflow(workflow: &Workflow) -> Result<()> {
    let fail = |message: String| FlowsimError::Catalog(format!("Workflow '{}': {}", workflow.id, message));

    if workflow.steps.is_empty() {
        return Err(fail("must have at least one step".to_string()));
    }

    let mut step_ids = HashSet::new();
    for (i, step) in workflow.steps.iter().enumerate() {
        if step.id.is_empty() {
            return Err(fail(format!("step {} must have an id", i + 1)));
        }
        if !step_ids.insert(step.id.as_str()) {
            return Err(fail(format!("duplicate step id '{}'", step.id)));
        }
        if !step.endpoint.starts_with('/') {
            return Err(fail(format!("step '{}' endpoint must start with '/'", step.id)));
        }
        if let Some(ref condition) = step.condition {
            if workflow.scenario(condition).is_none() {
                return Err(fail(format!(
                    "step '{}' references unknown scenario '{}'",
                    step.id, condition
                )));
            }
        }
        if !step.fields.is_empty() && step.body.is_none() {
            return Err(fail(format!("step '{}' declares fields but has no body", step.id)));
        }

        for field in &step.fields {
            let path = FieldPath::parse(&field.path).map_err(|e| fail(format!("step '{}': {}", step.id, e)))?;
            if field.kind == FieldKind::LineItems {
                let is_array = step
                    .body
                    .as_ref()
                    .and_then(|body| path.get(body))
                    .map(|v| v.is_array())
                    .unwrap_or(false);
                if !is_array {
                    return Err(fail(format!(
                        "step '{}': line-items field '{}' must point at an array in the body",
                        step.id, field.path
                    )));
                }
            }
        }
    }
    Ok(())
}
