//! Reference-data cache
//!
//! Categories are loaded lazily with a parallel fan-out; each fetch settles
//! on its own so one failing category never blocks the others.

use std::collections::BTreeMap;

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use super::sources::{self, category_for_endpoint, source_for, ReferenceSource};
use crate::engine::executor::{Executor, ResponsePayload};
use crate::engine::synth::{Credentials, RequestSynthesizer};
use crate::errors::ValidationError;

/// A cached reference record: id, display label and the full attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub id: JsonValue,
    pub label: String,
    pub attributes: Map<String, JsonValue>,
}

impl EntityRecord {
    /// Build a record from a JSON object carrying an `id`
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let attributes = value.as_object()?;
        let id = attributes.get("id").filter(|id| !id.is_null())?.clone();
        Some(Self {
            label: record_label(attributes, &id),
            id,
            attributes: attributes.clone(),
        })
    }

    /// Id rendered as plain text, without JSON quoting
    pub fn id_string(&self) -> String {
        scalar_text(&self.id)
    }

    /// Loose id comparison: `7` matches `"7"`
    pub fn matches_id(&self, raw: &str) -> bool {
        self.id_string() == raw.trim()
    }

    pub fn attr(&self, key: &str) -> Option<&JsonValue> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }
}

pub(crate) fn scalar_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn record_label(attributes: &Map<String, JsonValue>, id: &JsonValue) -> String {
    ["name", "name_en", "name_ar", "code"]
        .iter()
        .filter_map(|key| attributes.get(*key))
        .map(scalar_text)
        .find(|text| !text.is_empty() && text != "null")
        .unwrap_or_else(|| format!("ID: {}", scalar_text(id)))
}

/// Find the list inside a response payload.
///
/// Accepts a bare array, an array under `key`, under `data`, or the only
/// array-valued member of an object.
pub fn extract_list<'a>(payload: &'a JsonValue, key: Option<&str>) -> Option<&'a Vec<JsonValue>> {
    match payload {
        JsonValue::Array(items) => Some(items),
        JsonValue::Object(map) => {
            if let Some(items) = key.and_then(|k| map.get(k)).and_then(JsonValue::as_array) {
                return Some(items);
            }
            if let Some(items) = map.get("data").and_then(JsonValue::as_array) {
                return Some(items);
            }
            let mut arrays = map.values().filter_map(JsonValue::as_array);
            match (arrays.next(), arrays.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Find a single created/updated record: the payload itself when it carries
/// an `id`, or its only object member that does
fn extract_record(payload: &JsonValue) -> Option<EntityRecord> {
    let map = payload.as_object()?;
    if map.contains_key("id") {
        return EntityRecord::from_json(payload);
    }
    let mut records = map.values().filter(|v| v.get("id").is_some_and(|id| !id.is_null()));
    match (records.next(), records.next()) {
        (Some(only), None) => EntityRecord::from_json(only),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
struct CategoryEntry {
    records: Vec<EntityRecord>,
    loaded: bool,
}

/// Summary of one fan-out batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub loaded: Vec<(String, usize)>,
    pub failed: Vec<(String, String)>,
}

/// Category name to ordered reference records
#[derive(Debug, Clone, Default)]
pub struct EntityCache {
    categories: BTreeMap<String, CategoryEntry>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, category: &str) -> bool {
        self.categories.get(category).map(|e| e.loaded).unwrap_or(false)
    }

    pub fn records(&self, category: &str) -> &[EntityRecord] {
        self.categories.get(category).map(|e| e.records.as_slice()).unwrap_or(&[])
    }

    pub fn find(&self, category: &str, id: &str) -> Option<&EntityRecord> {
        self.records(category).iter().find(|r| r.matches_id(id))
    }

    /// Loaded categories with their record counts
    pub fn summary(&self) -> Vec<(String, usize)> {
        self.categories
            .iter()
            .filter(|(_, e)| e.loaded)
            .map(|(name, e)| (name.clone(), e.records.len()))
            .collect()
    }

    /// Replace a category's records and mark it loaded
    pub fn store(&mut self, category: &str, records: Vec<EntityRecord>) {
        self.categories.insert(category.to_string(), CategoryEntry { records, loaded: true });
    }

    /// Load every category in `categories` that is not loaded yet
    pub async fn ensure_loaded(
        &mut self,
        executor: &Executor,
        credentials: &Credentials,
        categories: &[&str],
    ) -> Result<LoadSummary, ValidationError> {
        let pending: Vec<&str> = categories.iter().copied().filter(|c| !self.is_loaded(c)).collect();
        self.load(executor, credentials, &pending).await
    }

    /// Re-fetch `categories` regardless of loaded state
    pub async fn refresh(
        &mut self,
        executor: &Executor,
        credentials: &Credentials,
        categories: &[&str],
    ) -> Result<LoadSummary, ValidationError> {
        self.load(executor, credentials, categories).await
    }

    async fn load(
        &mut self,
        executor: &Executor,
        credentials: &Credentials,
        categories: &[&str],
    ) -> Result<LoadSummary, ValidationError> {
        let mut summary = LoadSummary::default();
        let mut remote: Vec<&'static ReferenceSource> = Vec::new();

        for &category in categories {
            if let Some(records) = sources::static_seed(category) {
                summary.loaded.push((category.to_string(), records.len()));
                self.store(category, records);
            } else if let Some(source) = source_for(category) {
                if !remote.iter().any(|s| s.category == source.category) {
                    remote.push(source);
                }
            } else {
                warn!(category, "No reference source for category");
                summary.failed.push((category.to_string(), "unknown category".to_string()));
                self.store(category, Vec::new());
            }
        }

        if remote.is_empty() {
            return Ok(summary);
        }

        let synthesizer = RequestSynthesizer::new(credentials);
        let mut requests = Vec::with_capacity(remote.len());
        for source in &remote {
            requests.push((*source, synthesizer.reference_request(source.endpoint)?));
        }

        let fetches = requests.iter().map(|(source, request)| async move {
            let outcome = executor.execute(request).await;
            let result = if !outcome.is_success() {
                Err(match outcome.payload {
                    ResponsePayload::TransportError(message) => message,
                    _ => format!("HTTP {}", outcome.status),
                })
            } else {
                match outcome.payload.as_json().and_then(|p| extract_list(p, Some(source.response_key))) {
                    Some(items) => Ok(items.iter().filter_map(EntityRecord::from_json).collect::<Vec<_>>()),
                    None => Err("response did not contain a list".to_string()),
                }
            };
            (source.category, result)
        });

        for (category, result) in join_all(fetches).await {
            match result {
                Ok(records) => {
                    debug!(category, count = records.len(), "Reference data loaded");
                    summary.loaded.push((category.to_string(), records.len()));
                    self.store(category, records);
                }
                Err(error) => {
                    warn!(category, error = %error, "Reference data fetch failed");
                    summary.failed.push((category.to_string(), error));
                    self.store(category, Vec::new());
                }
            }
        }

        info!(loaded = summary.loaded.len(), failed = summary.failed.len(), "Reference data batch settled");
        Ok(summary)
    }

    /// Drop every fetched category; they are fetched again on next use.
    /// Seeded categories are restored at once since they never depend on the key.
    pub fn invalidate_all(&mut self) {
        self.categories.clear();
        for category in sources::SEEDED_CATEGORIES {
            if let Some(records) = sources::static_seed(category) {
                self.store(category, records);
            }
        }
    }

    /// Fold a successful step response into the category its endpoint names.
    ///
    /// A single created record wins over any array it carries; otherwise
    /// listed records are taken. Either way records are upserted by id.
    pub fn absorb(&mut self, endpoint: &str, payload: &JsonValue) -> Option<&'static str> {
        let category = category_for_endpoint(endpoint)?;
        let response_key = source_for(category).map(|s| s.response_key);

        let incoming: Vec<EntityRecord> = match extract_record(payload) {
            Some(record) => vec![record],
            None => extract_list(payload, response_key)
                .map(|items| items.iter().filter_map(EntityRecord::from_json).collect())
                .unwrap_or_default(),
        };
        if incoming.is_empty() {
            return None;
        }

        let entry = self.categories.entry(category.to_string()).or_default();
        for record in incoming {
            match entry.records.iter_mut().find(|r| r.id_string() == record.id_string()) {
                Some(existing) => *existing = record,
                None => entry.records.push(record),
            }
        }
        debug!(category, count = entry.records.len(), "Absorbed step response into cache");
        Some(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_fallback() {
        let named = EntityRecord::from_json(&json!({"id": 1, "name": "Acme"})).unwrap();
        let english = EntityRecord::from_json(&json!({"id": 2, "name_en": "Widget", "name_ar": "أداة"})).unwrap();
        let coded = EntityRecord::from_json(&json!({"id": 3, "code": "1101"})).unwrap();
        let bare = EntityRecord::from_json(&json!({"id": 4})).unwrap();
        assert_eq!(named.label, "Acme");
        assert_eq!(english.label, "Widget");
        assert_eq!(coded.label, "1101");
        assert_eq!(bare.label, "ID: 4");
        assert!(EntityRecord::from_json(&json!({"name": "no id"})).is_none());
    }

    #[test]
    fn test_matches_id_loosely() {
        let record = EntityRecord::from_json(&json!({"id": 7, "name": "x"})).unwrap();
        assert!(record.matches_id("7"));
        assert!(!record.matches_id("07"));
    }

    #[test]
    fn test_extract_list_shapes() {
        assert_eq!(extract_list(&json!([{"id": 1}]), None).unwrap().len(), 1);
        assert_eq!(
            extract_list(&json!({"product_unit_types": [{"id": 1}]}), Some("product_unit_types")).unwrap().len(),
            1
        );
        assert_eq!(extract_list(&json!({"data": [{"id": 1}, {"id": 2}]}), Some("x")).unwrap().len(), 2);
        assert!(extract_list(&json!({"a": [], "b": []}), None).is_none());
        assert!(extract_list(&json!("text"), None).is_none());
    }

    #[test]
    fn test_absorb_list_upserts() {
        let mut cache = EntityCache::new();
        cache.store("products", vec![EntityRecord::from_json(&json!({"id": 1, "name": "Old"})).unwrap()]);

        let category = cache.absorb(
            "/products?limit=100",
            &json!({"products": [{"id": 1, "name": "New"}, {"id": 2, "name": "Other"}]}),
        );
        assert_eq!(category, Some("products"));
        assert_eq!(cache.records("products").len(), 2);
        assert_eq!(cache.find("products", "1").unwrap().label, "New");
    }

    #[test]
    fn test_absorb_created_record() {
        let mut cache = EntityCache::new();
        let category = cache.absorb("/customers", &json!({"contact": {"id": 55, "name": "Sara"}}));
        assert_eq!(category, Some("customers"));
        assert_eq!(cache.find("customers", "55").unwrap().label, "Sara");
    }

    #[test]
    fn test_absorb_record_with_nested_array() {
        let mut cache = EntityCache::new();
        let category = cache.absorb(
            "/invoices",
            &json!({"id": 77, "reference": "INV-77", "line_items": [{"id": 1, "product_id": 3}]}),
        );
        assert_eq!(category, Some("invoices"));
        assert!(cache.find("invoices", "77").is_some());
        assert!(cache.find("invoices", "1").is_none());
    }

    #[test]
    fn test_absorb_wrapped_record_beside_array() {
        let mut cache = EntityCache::new();
        let category = cache.absorb("/invoices", &json!({"invoice": {"id": 78}, "warnings": []}));
        assert_eq!(category, Some("invoices"));
        assert!(cache.find("invoices", "78").is_some());
        assert_eq!(cache.records("invoices").len(), 1);
    }

    #[test]
    fn test_absorb_ignores_unknown_endpoints() {
        let mut cache = EntityCache::new();
        assert!(cache.absorb("/invoice_payments", &json!({"invoice_payment": {"id": 1}})).is_none());
        assert!(cache.summary().is_empty());
    }

    #[test]
    fn test_invalidate_all_keeps_seeds() {
        let mut cache = EntityCache::new();
        cache.store("customers", vec![EntityRecord::from_json(&json!({"id": 1, "name": "A"})).unwrap()]);
        cache.invalidate_all();
        assert!(!cache.is_loaded("customers"));
        assert!(cache.records("customers").is_empty());
        assert!(cache.is_loaded("taxes"));
        assert_eq!(cache.find("taxes", "2").unwrap().attr("value"), Some(&json!(0)));
        assert!(cache.is_loaded("statuses"));
    }
}
