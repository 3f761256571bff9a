//! Operator session
//!
//! The session is the one context object holding everything the operator
//! changes: the selected workflow and scenario, the cursor, step results,
//! per-step drafts, credentials and the reference cache. Every command takes
//! the step identity explicitly.

use std::collections::HashMap;

use chrono::Local;
use rand::Rng;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use super::cursor::{StepCursor, StepStatus};
use super::draft::StepDraft;
use super::executor::Executor;
use super::line_items::{is_purchase_endpoint, AutoFill};
use super::path::FieldPath;
use super::results::{ResultStore, StepResult};
use super::scenario::{position_of, resolve_scenario, visible_steps};
use super::synth::{Credentials, RequestSynthesizer, SynthesizedRequest};
use crate::cache::{EntityCache, LoadSummary};
use crate::catalog::{Catalog, FieldKind, Step, Workflow};
use crate::cli::SecretString;
use crate::errors::ValidationError;

pub struct Session {
    catalog: Catalog,
    workflow_id: String,
    scenario: Option<String>,
    cursor: StepCursor,
    results: ResultStore,
    drafts: HashMap<String, StepDraft>,
    credentials: Credentials,
    cache: EntityCache,
}

impl Session {
    /// Open a session on the catalog's first workflow
    pub fn new(catalog: Catalog, credentials: Credentials) -> Self {
        let (workflow_id, scenario) = catalog
            .workflows()
            .first()
            .map(|w| (w.id.clone(), w.default_scenario().map(str::to_string)))
            .unwrap_or_default();

        Self {
            catalog,
            workflow_id,
            scenario,
            cursor: StepCursor::new(),
            results: ResultStore::new(),
            drafts: HashMap::new(),
            credentials,
            cache: EntityCache::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn workflow(&self) -> Result<&Workflow, ValidationError> {
        self.catalog.require(&self.workflow_id)
    }

    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    pub fn cursor(&self) -> &StepCursor {
        &self.cursor
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut EntityCache {
        &mut self.cache
    }

    // ----- selection -----

    /// Switch workflow: results, drafts and cursor start over
    pub fn select_workflow(&mut self, workflow_id: &str, scenario: Option<&str>) -> Result<(), ValidationError> {
        let workflow = self.catalog.require(workflow_id)?;
        let scenario = resolve_scenario(workflow, scenario)?;

        self.workflow_id = workflow_id.to_string();
        self.scenario = scenario;
        self.cursor.reset();
        self.results.clear();
        self.drafts.clear();
        debug!(workflow = workflow_id, scenario = ?self.scenario, "Workflow selected");
        Ok(())
    }

    /// Switch scenario within the workflow: the cursor resets, results stay
    pub fn select_scenario(&mut self, scenario: &str) -> Result<(), ValidationError> {
        let workflow = self.workflow()?;
        self.scenario = resolve_scenario(workflow, Some(scenario))?;
        self.cursor.reset();
        Ok(())
    }

    /// Clear all results and return to the first step
    pub fn reset(&mut self) {
        self.results.clear();
        self.cursor.reset();
    }

    pub fn visible_steps(&self) -> Result<Vec<&Step>, ValidationError> {
        Ok(visible_steps(self.workflow()?, self.scenario()))
    }

    pub fn current_step(&self) -> Result<&Step, ValidationError> {
        let visible = self.visible_steps()?;
        let len = visible.len();
        visible
            .get(self.cursor.index())
            .copied()
            .ok_or(ValidationError::StepOutOfRange { index: self.cursor.index(), len })
    }

    /// Move the cursor to a visible step by id
    pub fn focus_step(&mut self, step_id: &str) -> Result<usize, ValidationError> {
        let (position, len) = {
            let visible = self.visible_steps()?;
            let position = position_of(&visible, step_id).ok_or_else(|| self.unknown_step(step_id))?;
            (position, visible.len())
        };
        self.cursor.focus(position, len)?;
        Ok(position)
    }

    pub fn focus_index(&mut self, index: usize) -> Result<(), ValidationError> {
        let len = self.visible_steps()?.len();
        self.cursor.focus(index, len)
    }

    /// Visible steps with their display status
    pub fn step_statuses(&self) -> Result<Vec<(&Step, StepStatus)>, ValidationError> {
        Ok(self
            .visible_steps()?
            .into_iter()
            .enumerate()
            .map(|(i, step)| (step, StepStatus::of(&step.id, i, &self.cursor, &self.results)))
            .collect())
    }

    fn unknown_step(&self, step_id: &str) -> ValidationError {
        ValidationError::UnknownStep(step_id.to_string())
    }

    fn step(&self, step_id: &str) -> Result<&Step, ValidationError> {
        self.workflow()?.step(step_id).ok_or_else(|| self.unknown_step(step_id))
    }

    // ----- credentials -----

    /// Change the API key; cached reference data belonged to the old key
    pub fn set_api_key(&mut self, api_key: Option<SecretString>) {
        self.credentials = Credentials::new(api_key, self.credentials.base_url.clone());
        self.cache.invalidate_all();
        info!("API key changed, reference cache cleared");
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.credentials.base_url = base_url.to_string();
        self.cache.invalidate_all();
    }

    // ----- drafts -----

    /// Current draft for a step, created from its template on first use
    pub fn draft(&mut self, step_id: &str) -> Result<&StepDraft, ValidationError> {
        Ok(&*self.draft_mut(step_id)?)
    }

    fn draft_mut(&mut self, step_id: &str) -> Result<&mut StepDraft, ValidationError> {
        let step = self
            .catalog
            .require(&self.workflow_id)?
            .step(step_id)
            .ok_or_else(|| ValidationError::UnknownStep(step_id.to_string()))?;
        Ok(self
            .drafts
            .entry(step_id.to_string())
            .or_insert_with(|| StepDraft::from_step(step)))
    }

    /// Set a form field; a line-item product id also auto-fills its row
    pub fn set_field(&mut self, step_id: &str, path: &str, raw: &str) -> Result<&JsonValue, ValidationError> {
        let step = self.step(step_id)?.clone();
        let parsed = FieldPath::parse(path)?;

        if let Some(cell) = StepDraft::cell_address(&step, &parsed) {
            if cell.column == "product_id" && self.cache.find("products", raw).is_some() {
                return self.select_line_item_product(step_id, &cell.items.to_string(), cell.row, raw);
            }
        }

        let draft = self.draft_mut(step_id)?;
        draft.set_field(&step, path, raw)?;
        Ok(draft.body())
    }

    pub fn add_line_item(&mut self, step_id: &str, items_path: &str) -> Result<usize, ValidationError> {
        let items = StepDraft::line_items_path(self.step(step_id)?, items_path)?;
        self.draft_mut(step_id)?.add_line_item(&items)
    }

    pub fn remove_line_item(&mut self, step_id: &str, items_path: &str, row: usize) -> Result<&JsonValue, ValidationError> {
        let items = StepDraft::line_items_path(self.step(step_id)?, items_path)?;
        let draft = self.draft_mut(step_id)?;
        draft.remove_line_item(&items, row)?;
        Ok(draft.body())
    }

    /// Select a cached product for a row, auto-filling price, description and tax
    pub fn select_line_item_product(
        &mut self,
        step_id: &str,
        items_path: &str,
        row: usize,
        product_id: &str,
    ) -> Result<&JsonValue, ValidationError> {
        let step = self.step(step_id)?;
        let items = StepDraft::line_items_path(step, items_path)?;
        let purchase = is_purchase_endpoint(&step.endpoint);

        let Some(product) = self.cache.find("products", product_id).cloned() else {
            let draft = self.draft_mut(step_id)?;
            draft.set_line_item_cell(&items, row, "product_id", product_id)?;
            return Ok(draft.body());
        };
        let fill = AutoFill::for_product(&product, &self.cache, purchase);

        let draft = self.draft_mut(step_id)?;
        draft.apply_line_item_product(&items, row, &product, &fill)?;
        Ok(draft.body())
    }

    pub fn set_raw_body(&mut self, step_id: &str, text: &str) -> Result<&JsonValue, ValidationError> {
        let draft = self.draft_mut(step_id)?;
        draft.set_raw(text)?;
        Ok(draft.body())
    }

    pub fn use_form(&mut self, step_id: &str) -> Result<(), ValidationError> {
        self.draft_mut(step_id)?.use_form();
        Ok(())
    }

    pub fn raw_view(&mut self, step_id: &str) -> Result<String, ValidationError> {
        Ok(self.draft_mut(step_id)?.raw_view())
    }

    pub fn set_resource_id(&mut self, step_id: &str, id: &str) -> Result<(), ValidationError> {
        self.draft_mut(step_id)?.set_resource_id(id);
        Ok(())
    }

    pub fn set_query(&mut self, step_id: &str, key: &str, value: &str) -> Result<(), ValidationError> {
        self.draft_mut(step_id)?.set_query(key, value);
        Ok(())
    }

    /// Fill empty fields with plausible values: dates become today,
    /// references get a random number, selects take a random cached option.
    pub fn fill_test_values(&mut self, step_id: &str) -> Result<&JsonValue, ValidationError> {
        let step = self.step(step_id)?.clone();
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let mut rng = rand::rng();

        let mut fills = Vec::new();
        {
            let draft = self.draft_mut(step_id)?;
            for field in &step.fields {
                let path = FieldPath::parse(&field.path)?;
                let empty = match path.get(draft.body()) {
                    None | Some(JsonValue::Null) => true,
                    Some(JsonValue::String(s)) => s.is_empty(),
                    Some(_) => false,
                };
                if empty {
                    fills.push((field.clone(), path));
                }
            }
        }

        for (field, path) in fills {
            let value = if field.kind == FieldKind::Date || field.name().contains("date") {
                Some(JsonValue::String(today.clone()))
            } else if field.name() == "reference" {
                Some(JsonValue::String(format!("REF-{}", rng.random_range(0..1000))))
            } else if field.kind == FieldKind::Select {
                let options = field.source.as_deref().map(|s| self.cache.records(s)).unwrap_or(&[]);
                if options.is_empty() {
                    None
                } else {
                    let pick = &options[rng.random_range(0..options.len())];
                    Some(JsonValue::String(pick.id_string()))
                }
            } else {
                None
            };

            if let Some(value) = value {
                self.draft_mut(step_id)?.set_value(&path, value)?;
            }
        }

        Ok(self.draft_mut(step_id)?.body())
    }

    // ----- reference data -----

    /// Categories a step's fields draw from
    pub fn reference_categories(&self, step_id: &str) -> Result<Vec<String>, ValidationError> {
        let step = self.step(step_id)?;
        let mut categories: Vec<String> = Vec::new();
        for field in &step.fields {
            if let Some(ref source) = field.source {
                if !categories.contains(source) {
                    categories.push(source.clone());
                }
            }
            if field.kind == FieldKind::LineItems && !categories.iter().any(|c| c == "taxes") {
                categories.push("taxes".to_string());
            }
        }
        Ok(categories)
    }

    /// Make sure the categories behind a step's fields are loaded
    pub async fn ensure_reference_data(&mut self, executor: &Executor, step_id: &str) -> Result<LoadSummary, ValidationError> {
        let categories = self.reference_categories(step_id)?;
        let categories: Vec<&str> = categories.iter().map(String::as_str).collect();
        self.cache.ensure_loaded(executor, &self.credentials, &categories).await
    }

    /// Re-fetch categories whether or not they are loaded
    pub async fn refresh_reference_data(&mut self, executor: &Executor, categories: &[&str]) -> Result<LoadSummary, ValidationError> {
        self.cache.refresh(executor, &self.credentials, categories).await
    }

    // ----- execution -----

    /// Build the request for a step; `preview` allows a missing key
    pub fn synthesize(&mut self, step_id: &str, preview: bool) -> Result<SynthesizedRequest, ValidationError> {
        let step = self.step(step_id)?.clone();
        let draft = self.draft_mut(step_id)?.clone();
        let synthesizer = if preview {
            RequestSynthesizer::preview(&self.credentials)
        } else {
            RequestSynthesizer::new(&self.credentials)
        };
        synthesizer.synthesize(&step, &draft)
    }

    /// Execute the step under the cursor.
    ///
    /// Local validation failures return `Err` and record nothing. Otherwise the
    /// outcome is recorded, successful JSON is folded into the cache and the
    /// cursor advances.
    pub async fn execute_current(&mut self, executor: &Executor) -> Result<StepResult, ValidationError> {
        let step = self.current_step()?.clone();
        let request = self.synthesize(&step.id, false)?;

        let outcome = executor.execute(&request).await;
        let result = StepResult::new(&step.id, &request.method, request.url.as_str(), outcome);
        info!(
            step = %step.id,
            status = result.outcome.status,
            duration_ms = result.outcome.duration_ms(),
            success = result.success(),
            "Step executed"
        );

        if result.success() {
            if let Some(payload) = result.outcome.payload.as_json() {
                self.cache.absorb(&step.endpoint, payload);
            }
            let len = self.visible_steps()?.len();
            self.cursor.advance(len);
        }
        self.results.record(result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntityRecord;
    use crate::catalog::builtin_catalog;
    use serde_json::json;

    fn session() -> Session {
        let mut session = Session::new(
            builtin_catalog(),
            Credentials::new(Some(SecretString("key".into())), "http://localhost:1"),
        );
        session.select_workflow("order-processing", Some("new-customer")).unwrap();
        session
    }

    fn record(step: &str, status: u16) -> StepResult {
        use crate::engine::executor::{ExecutionOutcome, ResponsePayload};
        StepResult::new(
            step,
            "GET",
            "http://x",
            ExecutionOutcome::new(status, std::time::Duration::ZERO, ResponsePayload::Json(json!({}))),
        )
    }

    #[test]
    fn test_scenario_switch_keeps_results() {
        let mut session = session();
        session.results.record(record("search-customer", 200));
        session.focus_step("fetch-products").unwrap();

        session.select_scenario("existing-customer").unwrap();
        assert_eq!(session.cursor().index(), 0);
        assert!(session.results().get("search-customer").is_some());

        let statuses = session.step_statuses().unwrap();
        assert_eq!(statuses[0].1, StepStatus::Success);
        assert_eq!(statuses[1].1, StepStatus::Pending);
    }

    #[test]
    fn test_workflow_switch_clears_state() {
        let mut session = session();
        session.results.record(record("search-customer", 200));
        session.set_field("create-invoice", "invoice.reference", "X-1").unwrap();
        session.focus_step("create-invoice").unwrap();

        session.select_workflow("order-processing", None).unwrap();
        assert_eq!(session.scenario(), Some("existing-customer"));
        assert!(session.results().is_empty());
        assert_eq!(session.cursor().index(), 0);
        assert_eq!(session.draft("create-invoice").unwrap().body()["invoice"]["reference"], "ORD-001");
    }

    #[test]
    fn test_focus_hidden_step_fails() {
        let mut session = session();
        session.select_scenario("cash-customer").unwrap();
        assert_eq!(
            session.focus_step("create-customer").unwrap_err(),
            ValidationError::UnknownStep("create-customer".to_string())
        );
    }

    #[test]
    fn test_api_key_change_clears_cache() {
        let mut session = session();
        session.cache_mut().store("customers", vec![EntityRecord::from_json(&json!({"id": 1, "name": "A"})).unwrap()]);
        session.set_api_key(Some(SecretString("other".into())));
        assert!(!session.cache().is_loaded("customers"));
        assert!(session.cache().records("customers").is_empty());
    }

    #[test]
    fn test_tax_lookup_survives_key_change() {
        let mut session = session();
        session.set_api_key(Some(SecretString("other".into())));
        session
            .cache_mut()
            .absorb("/products", &json!({"products": [{"id": 21, "name": "Zero rated", "selling_price": 5, "tax_id": 2}]}));

        let body = session
            .set_field("create-invoice", "invoice.line_items[0].product_id", "21")
            .unwrap()
            .clone();
        assert_eq!(body["invoice"]["line_items"][0]["tax_percent"], json!(0));
    }

    #[test]
    fn test_product_selection_by_set_field() {
        let mut session = session();
        session.select_workflow("purchase-restock", None).unwrap();
        session.cache_mut().store(
            "products",
            vec![EntityRecord::from_json(&json!({
                "id": 12, "name_en": "Bolt", "selling_price": 9, "buying_price": 4
            }))
            .unwrap()],
        );

        let body = session
            .set_field("create-bill", "bill.line_items[0].product_id", "12")
            .unwrap()
            .clone();
        let row = &body["bill"]["line_items"][0];
        assert_eq!(row["product_id"], json!(12));
        assert_eq!(row["unit_price"], json!(4));
        assert_eq!(row["description"], json!("Bolt"));
        assert_eq!(row["tax_percent"], json!(15));
    }

    #[test]
    fn test_fill_test_values_only_fills_empty_fields() {
        let mut session = session();
        session.set_field("create-customer", "contact.vat_number", "").unwrap();
        session.set_field("create-customer", "contact.name", "Kept").unwrap();
        let body = session.fill_test_values("create-customer").unwrap();
        assert_eq!(body["contact"]["name"], "Kept");
        assert_eq!(body["contact"]["vat_number"], "");

        session.select_workflow("invoice-creation", None).unwrap();
        session.set_field("create-invoice", "invoice.reference", "").unwrap();
        session.set_field("create-invoice", "invoice.due_date", "").unwrap();
        let body = session.fill_test_values("create-invoice").unwrap();
        assert!(body["invoice"]["reference"].as_str().unwrap().starts_with("REF-"));
        assert_eq!(body["invoice"]["due_date"].as_str().unwrap().len(), 10);
    }

    #[test]
    fn test_reference_categories() {
        let session = session();
        let categories = session.reference_categories("create-invoice").unwrap();
        assert_eq!(categories, vec!["customers", "statuses", "inventories", "products", "taxes"]);
    }
}
