//! Post-parsing processing of draft edit flags
//!
//! Edit flags arrive as loose strings (`[STEP:]PATH=VALUE` and friends). They
//! are resolved against the selected workflow into [`DraftEdit`]s and then
//! replayed onto the session's drafts in a fixed order.

use std::collections::HashSet;
use std::path::PathBuf;

use super::args::EditArgs;
use crate::catalog::Workflow;
use crate::engine::Session;
use crate::errors::{FlowsimError, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    FillTestValues,
    AddRow { items: String },
    Set { path: String, value: String },
    RemoveRow { items: String, row: usize },
    ResourceId(String),
    Query { key: String, value: String },
    RawBody(PathBuf),
}

/// One edit bound to a step
#[derive(Debug, Clone, PartialEq)]
pub struct DraftEdit {
    pub step_id: String,
    pub action: EditAction,
}

impl DraftEdit {
    /// Whether applying this edit reads the reference cache
    pub fn needs_reference_data(&self) -> bool {
        match &self.action {
            EditAction::FillTestValues | EditAction::AddRow { .. } => true,
            EditAction::Set { path, .. } => path.ends_with("product_id"),
            _ => false,
        }
    }
}

/// Split an optional `STEP:` prefix; the prefix only counts when it names a step
fn split_step<'a>(workflow: &Workflow, text: &'a str) -> (Option<&'a str>, &'a str) {
    match text.split_once(':') {
        Some((head, rest)) if workflow.step(head).is_some() => (Some(head), rest),
        _ => (None, text),
    }
}

fn split_pair<'a>(flag: &str, text: &'a str) -> Result<(&'a str, &'a str), FlowsimError> {
    text.split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or_else(|| FlowsimError::Argument(format!("{} expects KEY=VALUE, got '{}'", flag, text)))
}

/// `invoice.line_items[2]` → (`invoice.line_items`, 2)
fn split_row(text: &str) -> Option<(&str, usize)> {
    let open = text.rfind('[')?;
    let index = text[open + 1..].strip_suffix(']')?.trim().parse().ok()?;
    let items = &text[..open];
    (!items.is_empty()).then_some((items, index))
}

/// Resolve edit flags against a workflow.
///
/// Unprefixed edits target `default_step`. The result is ordered: test
/// values first, then row additions, field sets, row removals, resource ids,
/// query overrides and finally raw bodies.
pub fn parse_edits(edits: &EditArgs, workflow: &Workflow, default_step: &str) -> Result<Vec<DraftEdit>, FlowsimError> {
    let mut parsed = Vec::new();
    let mut push = |step: Option<&str>, action: EditAction| {
        parsed.push(DraftEdit { step_id: step.unwrap_or(default_step).to_string(), action });
    };

    for step in &edits.fill {
        let step = step.trim();
        if step.is_empty() {
            push(None, EditAction::FillTestValues);
        } else if workflow.step(step).is_some() {
            push(Some(step), EditAction::FillTestValues);
        } else {
            return Err(ValidationError::UnknownStep(step.to_string()).into());
        }
    }

    for text in &edits.add_row {
        let (step, items) = split_step(workflow, text);
        push(step, EditAction::AddRow { items: items.to_string() });
    }

    for text in &edits.set {
        let (step, rest) = split_step(workflow, text);
        let (path, value) = split_pair("--set", rest)?;
        push(step, EditAction::Set { path: path.trim().to_string(), value: value.to_string() });
    }

    for text in &edits.remove_row {
        let (step, rest) = split_step(workflow, text);
        let (items, row) = split_row(rest)
            .ok_or_else(|| FlowsimError::Argument(format!("--remove-row expects PATH[N], got '{}'", text)))?;
        push(step, EditAction::RemoveRow { items: items.to_string(), row });
    }

    for text in &edits.id {
        let (step, id) = split_step(workflow, text);
        push(step, EditAction::ResourceId(id.trim().to_string()));
    }

    for text in &edits.query {
        let (step, rest) = split_step(workflow, text);
        let (key, value) = split_pair("--query", rest)?;
        push(step, EditAction::Query { key: key.to_string(), value: value.to_string() });
    }

    for text in &edits.raw_body {
        let (step, file) = split_step(workflow, text);
        push(step, EditAction::RawBody(PathBuf::from(file)));
    }

    Ok(parsed)
}

/// Steps whose reference data should be loaded before the edits are applied
pub fn reference_targets(edits: &[DraftEdit]) -> Vec<String> {
    let mut seen = HashSet::new();
    edits
        .iter()
        .filter(|e| e.needs_reference_data())
        .filter(|e| seen.insert(e.step_id.clone()))
        .map(|e| e.step_id.clone())
        .collect()
}

/// Replay edits onto the session drafts
pub fn apply_edits(session: &mut Session, edits: &[DraftEdit]) -> Result<(), FlowsimError> {
    for edit in edits {
        let step = edit.step_id.as_str();
        match &edit.action {
            EditAction::FillTestValues => {
                session.fill_test_values(step)?;
            }
            EditAction::AddRow { items } => {
                session.add_line_item(step, items)?;
            }
            EditAction::Set { path, value } => {
                session.set_field(step, path, value)?;
            }
            EditAction::RemoveRow { items, row } => {
                session.remove_line_item(step, items, *row)?;
            }
            EditAction::ResourceId(id) => session.set_resource_id(step, id)?,
            EditAction::Query { key, value } => session.set_query(step, key, value)?,
            EditAction::RawBody(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| FlowsimError::Argument(format!("Failed to read {}: {}", path.display(), e)))?;
                session.set_raw_body(step, &text)?;
            }
        }
        tracing::debug!(step = %step, edit = ?edit.action, "Draft edit applied");
    }
    Ok(())
}
