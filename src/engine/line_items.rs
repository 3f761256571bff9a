//! Line-item rows: blank rows, product auto-fill and send-time normalization

use std::collections::HashSet;

use serde_json::{json, Map, Number, Value as JsonValue};

use crate::cache::{EntityCache, EntityRecord};

/// Tax rate used when a product has no mapped tax
pub const DEFAULT_TAX_PERCENT: u64 = 15;

/// Columns auto-filled from the selected product
pub const AUTO_FILLED_COLUMNS: [&str; 3] = ["unit_price", "description", "tax_percent"];

/// Columns holding numbers in a line-item row
const NUMERIC_COLUMNS: [&str; 4] = ["quantity", "unit_price", "tax_percent", "discount"];

/// A fresh, unselected row
pub fn blank_row() -> JsonValue {
    json!({"product_id": "", "quantity": 1, "unit_price": ""})
}

pub fn is_numeric_column(column: &str) -> bool {
    NUMERIC_COLUMNS.contains(&column)
}

/// Purchasing endpoints price rows from the buying side
pub fn is_purchase_endpoint(endpoint: &str) -> bool {
    let endpoint = endpoint.to_ascii_lowercase();
    ["purchase", "orders", "bills"].iter().any(|marker| endpoint.contains(marker))
}

/// Columns the operator edited by hand since the row's last product change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowEdits {
    manual: HashSet<String>,
}

impl RowEdits {
    pub fn mark_manual(&mut self, column: &str) {
        self.manual.insert(column.to_string());
    }

    pub fn is_manual(&self, column: &str) -> bool {
        self.manual.contains(column)
    }

    fn clear(&mut self) {
        self.manual.clear();
    }
}

/// Values derived from a product for one row
#[derive(Debug, Clone, PartialEq)]
pub struct AutoFill {
    pub unit_price: JsonValue,
    pub description: JsonValue,
    pub tax_percent: JsonValue,
}

impl AutoFill {
    /// Price from the purchase or sales side, tax from the product's tax mapping
    pub fn for_product(product: &EntityRecord, cache: &EntityCache, purchase: bool) -> Self {
        let price_key = if purchase { "buying_price" } else { "selling_price" };
        let unit_price = product.attr(price_key).cloned().unwrap_or(JsonValue::Null);

        let description = ["name_en", "name_ar", "name"]
            .iter()
            .filter_map(|key| product.attr(key))
            .find(|v| v.as_str().map(|s| !s.is_empty()).unwrap_or(true))
            .cloned()
            .unwrap_or(JsonValue::Null);

        let tax_percent = product
            .attr("tax_id")
            .map(crate::cache::entity::scalar_text)
            .and_then(|tax_id| cache.find("taxes", &tax_id))
            .and_then(|tax| tax.attr("value").cloned())
            .unwrap_or_else(|| json!(DEFAULT_TAX_PERCENT));

        Self { unit_price, description, tax_percent }
    }

    fn value(&self, column: &str) -> Option<&JsonValue> {
        match column {
            "unit_price" => Some(&self.unit_price),
            "description" => Some(&self.description),
            "tax_percent" => Some(&self.tax_percent),
            _ => None,
        }
    }
}

/// Set the row's product and auto-fill the columns not edited by hand.
///
/// The row's edit flags are cleared afterwards: a new product starts a new
/// auto-fill window.
pub fn apply_product(row: &mut JsonValue, edits: &mut RowEdits, product: &EntityRecord, fill: &AutoFill) {
    if !row.is_object() {
        *row = blank_row();
    }
    if let Some(map) = row.as_object_mut() {
        map.insert("product_id".to_string(), product.id.clone());
        for column in AUTO_FILLED_COLUMNS {
            if edits.is_manual(column) {
                continue;
            }
            if let Some(value) = fill.value(column) {
                map.insert(column.to_string(), value.clone());
            }
        }
    }
    edits.clear();
}

fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn to_number(value: Option<&JsonValue>) -> Option<Number> {
    match value? {
        JsonValue::Number(n) => Some(n.clone()),
        JsonValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .map(Number::from)
                .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
        }
        _ => None,
    }
}

/// Rows ready to send: those with a product and a quantity.
///
/// Quantity and unit price become numbers (a blank price is 0); other
/// columns such as tax and discount pass through.
pub fn normalize_rows(rows: &[JsonValue]) -> Vec<JsonValue> {
    rows.iter()
        .filter_map(|row| {
            let map = row.as_object()?;
            if is_blank(map.get("product_id")) || is_blank(map.get("quantity")) {
                return None;
            }
            let quantity = to_number(map.get("quantity"))?;
            let unit_price = to_number(map.get("unit_price")).unwrap_or_else(|| Number::from(0));

            let mut normalized: Map<String, JsonValue> = map
                .iter()
                .filter(|(_, v)| !is_blank(Some(v)))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            normalized.insert("quantity".to_string(), JsonValue::Number(quantity));
            normalized.insert("unit_price".to_string(), JsonValue::Number(unit_price));
            Some(JsonValue::Object(normalized))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::sources::static_seed;

    fn cache_with_taxes() -> EntityCache {
        let mut cache = EntityCache::new();
        cache.store("taxes", static_seed("taxes").unwrap());
        cache
    }

    fn product(value: JsonValue) -> EntityRecord {
        EntityRecord::from_json(&value).unwrap()
    }

    #[test]
    fn test_purchase_detection() {
        assert!(is_purchase_endpoint("/orders"));
        assert!(is_purchase_endpoint("/bills"));
        assert!(is_purchase_endpoint("/simple_bills"));
        assert!(is_purchase_endpoint("/purchase_orders"));
        assert!(!is_purchase_endpoint("/invoices"));
    }

    #[test]
    fn test_auto_fill_sales_and_purchase() {
        let cache = cache_with_taxes();
        let p = product(json!({
            "id": 9, "name_en": "Mug", "name_ar": "كوب",
            "selling_price": 40, "buying_price": 22, "tax_id": 2
        }));

        let sales = AutoFill::for_product(&p, &cache, false);
        assert_eq!(sales.unit_price, json!(40));
        assert_eq!(sales.description, json!("Mug"));
        assert_eq!(sales.tax_percent, json!(0));

        let purchase = AutoFill::for_product(&p, &cache, true);
        assert_eq!(purchase.unit_price, json!(22));
    }

    #[test]
    fn test_unmapped_tax_defaults_to_fifteen() {
        let cache = cache_with_taxes();
        let no_tax = product(json!({"id": 1, "name": "Pen", "selling_price": 3}));
        let unknown_tax = product(json!({"id": 2, "name": "Pad", "selling_price": 3, "tax_id": 99}));
        assert_eq!(AutoFill::for_product(&no_tax, &cache, false).tax_percent, json!(15));
        assert_eq!(AutoFill::for_product(&unknown_tax, &cache, false).tax_percent, json!(15));
        assert_eq!(AutoFill::for_product(&no_tax, &cache, false).description, json!("Pen"));
    }

    #[test]
    fn test_apply_product_respects_manual_edits() {
        let cache = cache_with_taxes();
        let p = product(json!({"id": 5, "name_en": "Lamp", "selling_price": 80, "tax_id": 1}));
        let fill = AutoFill::for_product(&p, &cache, false);

        let mut row = json!({"product_id": "", "quantity": 2, "unit_price": 99});
        let mut edits = RowEdits::default();
        edits.mark_manual("unit_price");
        apply_product(&mut row, &mut edits, &p, &fill);

        assert_eq!(row["product_id"], json!(5));
        assert_eq!(row["unit_price"], json!(99));
        assert_eq!(row["description"], json!("Lamp"));
        assert_eq!(row["tax_percent"], json!(15));
        assert_eq!(row["quantity"], json!(2));

        // the next product change starts fresh
        apply_product(&mut row, &mut edits, &p, &fill);
        assert_eq!(row["unit_price"], json!(80));
    }

    #[test]
    fn test_normalize_rows() {
        let rows = vec![
            json!({"product_id": 3, "quantity": "2", "unit_price": "", "discount": 0, "description": ""}),
            json!({"product_id": "", "quantity": 1, "unit_price": ""}),
            json!({"product_id": "4", "quantity": 1, "unit_price": "12.5", "tax_percent": 15}),
        ];
        let normalized = normalize_rows(&rows);
        assert_eq!(
            normalized,
            vec![
                json!({"product_id": 3, "quantity": 2, "unit_price": 0, "discount": 0}),
                json!({"product_id": "4", "quantity": 1, "unit_price": 12.5, "tax_percent": 15}),
            ]
        );
    }
}
