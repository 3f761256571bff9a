//! Per-step working copy of a request body
//!
//! The draft owns the single body object both editing views read and write.
//! Form edits mutate it in place; a valid raw edit replaces it. The raw view
//! is always rendered from it unless raw text is being edited.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Number, Value as JsonValue};

use super::line_items::{self, blank_row, AutoFill, RowEdits};
use super::path::{FieldPath, PathToken};
use super::synth::RequestBody;
use crate::cache::EntityRecord;
use crate::catalog::{FieldKind, Step};
use crate::errors::ValidationError;

#[derive(Debug, Clone, PartialEq)]
pub enum BodyMode {
    Form,
    /// Raw-editor text, sent verbatim once it parses
    Raw(String),
}

/// A path that lands on one cell of a line-items array
#[derive(Debug, Clone, PartialEq)]
pub struct CellAddress {
    pub items: FieldPath,
    pub row: usize,
    pub column: String,
}

#[derive(Debug, Clone)]
pub struct StepDraft {
    body: JsonValue,
    mode: BodyMode,
    row_edits: HashMap<String, Vec<RowEdits>>,
    resource_id: Option<String>,
    query: IndexMap<String, String>,
}

/// Coerce operator text into the JSON value a field of `kind` holds
pub fn coerce_value(kind: FieldKind, field: &str, raw: &str) -> Result<JsonValue, ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidFieldValue {
        field: field.to_string(),
        message: message.to_string(),
    };

    match kind {
        FieldKind::Checkbox => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(JsonValue::Bool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(JsonValue::Bool(false)),
            _ => Err(invalid("expected true or false")),
        },
        FieldKind::Number => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(JsonValue::Null);
            }
            parse_number(raw).map(JsonValue::Number).ok_or_else(|| invalid("expected a number"))
        }
        FieldKind::LineItems => match serde_json::from_str::<JsonValue>(raw) {
            Ok(value @ JsonValue::Array(_)) => Ok(value),
            _ => Err(invalid("expected a JSON array of rows")),
        },
        _ => Ok(JsonValue::String(raw.to_string())),
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    raw.parse::<i64>()
        .ok()
        .map(Number::from)
        .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64))
}

/// Value for a path no descriptor declares: JSON scalars as typed, anything else as text
fn infer_value(raw: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(raw.trim()) {
        Ok(value) if !value.is_object() && !value.is_array() => value,
        _ => JsonValue::String(raw.to_string()),
    }
}

impl StepDraft {
    pub fn from_step(step: &Step) -> Self {
        Self {
            body: step.body.clone().unwrap_or_else(|| JsonValue::Object(Default::default())),
            mode: BodyMode::Form,
            row_edits: HashMap::new(),
            resource_id: None,
            query: IndexMap::new(),
        }
    }

    pub fn body(&self) -> &JsonValue {
        &self.body
    }

    pub fn mode(&self) -> &BodyMode {
        &self.mode
    }

    /// Text the raw editor shows
    pub fn raw_view(&self) -> String {
        match self.mode {
            BodyMode::Raw(ref text) => text.clone(),
            BodyMode::Form => serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| self.body.to_string()),
        }
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn set_resource_id(&mut self, id: &str) {
        self.resource_id = Some(id.to_string());
    }

    pub fn query_overrides(&self) -> &IndexMap<String, String> {
        &self.query
    }

    pub fn set_query(&mut self, key: &str, value: &str) {
        self.query.insert(key.to_string(), value.to_string());
    }

    /// Store a value at `path` and return to form mode
    pub fn set_value(&mut self, path: &FieldPath, value: JsonValue) -> Result<(), ValidationError> {
        path.set(&mut self.body, value)?;
        self.mode = BodyMode::Form;
        Ok(())
    }

    /// Locate a line-item cell addressed by `path`, if it is one
    pub fn cell_address(step: &Step, path: &FieldPath) -> Option<CellAddress> {
        step.fields.iter().filter(|f| f.kind == FieldKind::LineItems).find_map(|field| {
            let items = FieldPath::parse(&field.path).ok()?;
            let prefix = items.tokens().len();
            match path.tokens().get(prefix..)? {
                [PathToken::Index(row), PathToken::Key(column)] if path.tokens().starts_with(items.tokens()) => {
                    Some(CellAddress { items: items.clone(), row: *row, column: column.clone() })
                }
                _ => None,
            }
        })
    }

    /// Set a form field from operator text, coercing by the field's declared kind
    pub fn set_field(&mut self, step: &Step, path: &str, raw: &str) -> Result<(), ValidationError> {
        let parsed = FieldPath::parse(path)?;

        if let Some(cell) = Self::cell_address(step, &parsed) {
            return self.set_line_item_cell(&cell.items, cell.row, &cell.column, raw);
        }

        let descriptor = step
            .fields
            .iter()
            .find(|f| FieldPath::parse(&f.path).map(|p| p == parsed).unwrap_or(false));

        let value = match descriptor {
            Some(field) => coerce_value(field.kind, &field.path, raw)?,
            None => infer_value(raw),
        };

        if let Some(field) = descriptor.filter(|f| f.kind == FieldKind::LineItems) {
            self.row_edits.remove(&field.path);
        }
        self.set_value(&parsed, value)
    }

    /// Path of the step's line-items field matching `path`
    pub fn line_items_path(step: &Step, path: &str) -> Result<FieldPath, ValidationError> {
        let parsed = FieldPath::parse(path)?;
        step.fields
            .iter()
            .filter(|f| f.kind == FieldKind::LineItems)
            .filter_map(|f| FieldPath::parse(&f.path).ok())
            .find(|p| *p == parsed)
            .ok_or_else(|| ValidationError::NotLineItems(path.to_string()))
    }

    pub fn line_item_rows(&self, items: &FieldPath) -> &[JsonValue] {
        items.get(&self.body).and_then(JsonValue::as_array).map(Vec::as_slice).unwrap_or(&[])
    }

    fn rows_mut(&mut self, items: &FieldPath) -> Result<&mut Vec<JsonValue>, ValidationError> {
        if !matches!(items.get(&self.body), Some(JsonValue::Array(_))) {
            items.set(&mut self.body, JsonValue::Array(vec![blank_row()]))?;
        }
        items
            .get_mut(&mut self.body)
            .and_then(JsonValue::as_array_mut)
            .ok_or_else(|| ValidationError::NotLineItems(items.to_string()))
    }

    fn edits_mut(&mut self, items: &FieldPath, len: usize) -> &mut Vec<RowEdits> {
        let edits = self.row_edits.entry(items.to_string()).or_default();
        edits.resize_with(len, RowEdits::default);
        edits
    }

    /// Append a blank row, returning its index
    pub fn add_line_item(&mut self, items: &FieldPath) -> Result<usize, ValidationError> {
        let rows = self.rows_mut(items)?;
        rows.push(blank_row());
        let len = rows.len();
        self.edits_mut(items, len);
        self.mode = BodyMode::Form;
        Ok(len - 1)
    }

    /// Remove a row; the last remaining row is cleared instead of removed
    pub fn remove_line_item(&mut self, items: &FieldPath, row: usize) -> Result<(), ValidationError> {
        let rows = self.rows_mut(items)?;
        let len = rows.len();
        if row >= len {
            return Err(ValidationError::RowOutOfRange { row, len });
        }

        if len > 1 {
            rows.remove(row);
            let edits = self.edits_mut(items, len);
            edits.remove(row);
        } else {
            rows[0] = blank_row();
            self.edits_mut(items, len)[0] = RowEdits::default();
        }
        self.mode = BodyMode::Form;
        Ok(())
    }

    fn check_row(&mut self, items: &FieldPath, row: usize) -> Result<usize, ValidationError> {
        let len = self.rows_mut(items)?.len();
        if row >= len {
            return Err(ValidationError::RowOutOfRange { row, len });
        }
        Ok(len)
    }

    /// Set one cell by hand; auto-filled columns are then left alone until the next product change
    pub fn set_line_item_cell(
        &mut self,
        items: &FieldPath,
        row: usize,
        column: &str,
        raw: &str,
    ) -> Result<(), ValidationError> {
        let len = self.check_row(items, row)?;

        let value = if line_items::is_numeric_column(column) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                JsonValue::String(String::new())
            } else {
                parse_number(trimmed).map(JsonValue::Number).ok_or_else(|| ValidationError::InvalidFieldValue {
                    field: format!("{}[{}].{}", items, row, column),
                    message: "expected a number".to_string(),
                })?
            }
        } else if column == "product_id" {
            infer_value(raw)
        } else {
            JsonValue::String(raw.to_string())
        };

        let edits = self.edits_mut(items, len);
        if column == "product_id" {
            edits[row] = RowEdits::default();
        } else if line_items::AUTO_FILLED_COLUMNS.contains(&column) {
            edits[row].mark_manual(column);
        }

        self.set_value(&items.child_index(row).child_key(column), value)
    }

    /// Select a product for a row and auto-fill it
    pub fn apply_line_item_product(
        &mut self,
        items: &FieldPath,
        row: usize,
        product: &EntityRecord,
        fill: &AutoFill,
    ) -> Result<(), ValidationError> {
        let len = self.check_row(items, row)?;
        let mut edits = std::mem::take(&mut self.edits_mut(items, len)[row]);

        let rows = self.rows_mut(items)?;
        line_items::apply_product(&mut rows[row], &mut edits, product, fill);

        self.edits_mut(items, len)[row] = edits;
        self.mode = BodyMode::Form;
        Ok(())
    }

    /// Whether a row's column was edited by hand since its last product change
    pub fn is_manual(&self, items: &FieldPath, row: usize, column: &str) -> bool {
        self.row_edits
            .get(&items.to_string())
            .and_then(|edits| edits.get(row))
            .map(|e| e.is_manual(column))
            .unwrap_or(false)
    }

    /// Enter raw mode with `text`; a parseable text also replaces the body.
    ///
    /// Malformed text is kept so the operator can fix it, and reported.
    pub fn set_raw(&mut self, text: &str) -> Result<(), ValidationError> {
        self.mode = BodyMode::Raw(text.to_string());
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|e| ValidationError::MalformedBody { message: e.to_string() })?;
        self.body = value;
        self.row_edits.clear();
        Ok(())
    }

    /// Leave raw mode; the body keeps the last successfully parsed raw text
    pub fn use_form(&mut self) {
        self.mode = BodyMode::Form;
    }

    /// Body to send for `step`, or `None` when the method carries no body
    pub fn request_body(&self, step: &Step) -> Result<Option<RequestBody>, ValidationError> {
        if !step.sends_body() {
            return Ok(None);
        }

        match self.mode {
            BodyMode::Raw(ref text) => {
                serde_json::from_str::<JsonValue>(text)
                    .map_err(|e| ValidationError::MalformedBody { message: e.to_string() })?;
                Ok(Some(RequestBody::Raw(text.clone())))
            }
            BodyMode::Form => {
                let mut body = self.body.clone();
                for field in step.fields.iter().filter(|f| f.kind == FieldKind::LineItems) {
                    let path = FieldPath::parse(&field.path)?;
                    let Some(rows) = path.get(&body).and_then(JsonValue::as_array) else {
                        continue;
                    };
                    let normalized = line_items::normalize_rows(rows);
                    let replacement = if normalized.is_empty() {
                        step.body.as_ref().and_then(|template| path.get(template)).cloned()
                    } else {
                        Some(JsonValue::Array(normalized))
                    };
                    if let Some(value) = replacement {
                        path.set(&mut body, value)?;
                    }
                }
                Ok(Some(RequestBody::Json(body)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntityCache;
    use crate::catalog::builtin_catalog;
    use serde_json::json;

    fn create_invoice() -> Step {
        builtin_catalog()
            .get("order-processing")
            .unwrap()
            .step("create-invoice")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_coerce_by_kind() {
        assert_eq!(coerce_value(FieldKind::Checkbox, "f", "yes").unwrap(), json!(true));
        assert_eq!(coerce_value(FieldKind::Number, "f", "").unwrap(), JsonValue::Null);
        assert_eq!(coerce_value(FieldKind::Number, "f", "12").unwrap(), json!(12));
        assert_eq!(coerce_value(FieldKind::Number, "f", "1.5").unwrap(), json!(1.5));
        assert!(coerce_value(FieldKind::Number, "f", "abc").is_err());
        assert_eq!(coerce_value(FieldKind::Select, "f", "7").unwrap(), json!("7"));
        assert_eq!(coerce_value(FieldKind::Date, "f", "2026-01-01").unwrap(), json!("2026-01-01"));
    }

    #[test]
    fn test_form_edit_is_visible_in_raw_view() {
        let step = create_invoice();
        let mut draft = StepDraft::from_step(&step);
        draft.set_field(&step, "invoice.reference", "ORD-777").unwrap();

        let raw: JsonValue = serde_json::from_str(&draft.raw_view()).unwrap();
        assert_eq!(raw["invoice"]["reference"], "ORD-777");
        assert_eq!(&raw, draft.body());
    }

    #[test]
    fn test_raw_edit_updates_form_body() {
        let step = create_invoice();
        let mut draft = StepDraft::from_step(&step);
        draft.set_raw(r#"{"invoice": {"reference": "RAW-1", "line_items": []}}"#).unwrap();
        assert_eq!(draft.body()["invoice"]["reference"], "RAW-1");
        assert!(matches!(draft.mode(), BodyMode::Raw(_)));

        let body = draft.request_body(&step).unwrap().unwrap();
        assert_eq!(body, RequestBody::Raw(r#"{"invoice": {"reference": "RAW-1", "line_items": []}}"#.to_string()));
    }

    #[test]
    fn test_malformed_raw_is_local_error() {
        let step = create_invoice();
        let mut draft = StepDraft::from_step(&step);
        let before = draft.body().clone();

        assert!(matches!(draft.set_raw("{not json"), Err(ValidationError::MalformedBody { .. })));
        assert_eq!(draft.body(), &before);
        assert_eq!(draft.raw_view(), "{not json");
        assert!(matches!(draft.request_body(&step), Err(ValidationError::MalformedBody { .. })));

        draft.use_form();
        assert!(draft.request_body(&step).is_ok());
    }

    #[test]
    fn test_last_row_is_cleared_not_removed() {
        let step = create_invoice();
        let items = StepDraft::line_items_path(&step, "invoice.line_items").unwrap();
        let mut draft = StepDraft::from_step(&step);

        draft.remove_line_item(&items, 0).unwrap();
        assert_eq!(draft.line_item_rows(&items), &[blank_row()]);

        assert_eq!(draft.add_line_item(&items).unwrap(), 1);
        draft.remove_line_item(&items, 0).unwrap();
        assert_eq!(draft.line_item_rows(&items).len(), 1);
        assert!(matches!(
            draft.remove_line_item(&items, 4),
            Err(ValidationError::RowOutOfRange { row: 4, len: 1 })
        ));
    }

    #[test]
    fn test_cell_edit_targets_the_declared_array() {
        let catalog = builtin_catalog();
        let order = catalog.get("purchase-restock").unwrap().step("create-purchase-order").unwrap();
        let bill = catalog.get("purchase-restock").unwrap().step("create-bill").unwrap();

        for (step, wrapper) in [(order, "order"), (bill, "bill")] {
            let mut draft = StepDraft::from_step(step);
            let items = StepDraft::line_items_path(step, &format!("{}.line_items", wrapper)).unwrap();
            draft.add_line_item(&items).unwrap();
            draft.add_line_item(&items).unwrap();
            draft
                .set_field(step, &format!("{}.line_items[2].unit_price", wrapper), "7.25")
                .unwrap();
            assert_eq!(draft.body()[wrapper]["line_items"][2]["unit_price"], json!(7.25));
            assert!(draft.is_manual(&items, 2, "unit_price"));
            assert!(!draft.is_manual(&items, 1, "unit_price"));
        }
    }

    #[test]
    fn test_product_change_respects_manual_price() {
        let step = create_invoice();
        let items = StepDraft::line_items_path(&step, "invoice.line_items").unwrap();
        let mut draft = StepDraft::from_step(&step);

        let mut cache = EntityCache::new();
        cache.store("taxes", crate::cache::sources::static_seed("taxes").unwrap());
        let product = EntityRecord::from_json(&json!({"id": 3, "name_en": "Cup", "selling_price": 20, "tax_id": 1})).unwrap();
        let fill = AutoFill::for_product(&product, &cache, false);

        draft.set_line_item_cell(&items, 0, "unit_price", "18").unwrap();
        draft.apply_line_item_product(&items, 0, &product, &fill).unwrap();
        let row = &draft.line_item_rows(&items)[0];
        assert_eq!(row["unit_price"], json!(18));
        assert_eq!(row["tax_percent"], json!(15));
        assert_eq!(row["product_id"], json!(3));
        assert!(!draft.is_manual(&items, 0, "unit_price"));
    }

    #[test]
    fn test_request_body_normalizes_rows_or_keeps_template() {
        let step = create_invoice();
        let items = StepDraft::line_items_path(&step, "invoice.line_items").unwrap();
        let mut draft = StepDraft::from_step(&step);

        draft.remove_line_item(&items, 0).unwrap();
        let Some(RequestBody::Json(body)) = draft.request_body(&step).unwrap() else {
            panic!("expected json body");
        };
        assert_eq!(body["invoice"]["line_items"], json!([{"product_id": 1, "quantity": 1, "unit_price": 100}]));

        draft.set_line_item_cell(&items, 0, "product_id", "4").unwrap();
        draft.set_line_item_cell(&items, 0, "quantity", "3").unwrap();
        let Some(RequestBody::Json(body)) = draft.request_body(&step).unwrap() else {
            panic!("expected json body");
        };
        assert_eq!(body["invoice"]["line_items"], json!([{"product_id": 4, "quantity": 3, "unit_price": 0}]));
    }

    #[test]
    fn test_body_round_trips_through_text() {
        let step = create_invoice();
        let draft = StepDraft::from_step(&step);
        let Some(body) = draft.request_body(&step).unwrap() else {
            panic!("expected body");
        };
        let parsed: JsonValue = serde_json::from_str(&body.to_text()).unwrap();
        assert_eq!(&parsed, draft.body());
    }

    #[test]
    fn test_undeclared_path_infers_scalars() {
        let step = create_invoice();
        let mut draft = StepDraft::from_step(&step);
        draft.set_field(&step, "invoice.description", "hello").unwrap();
        draft.set_field(&step, "invoice.extra.flag", "true").unwrap();
        assert_eq!(draft.body()["invoice"]["description"], json!("hello"));
        assert_eq!(draft.body()["invoice"]["extra"]["flag"], json!(true));
    }

    #[test]
    fn test_unknown_line_items_path() {
        let step = create_invoice();
        assert_eq!(
            StepDraft::line_items_path(&step, "invoice.reference").unwrap_err(),
            ValidationError::NotLineItems("invoice.reference".to_string())
        );
    }
}
