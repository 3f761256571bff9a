//! Reference-data sources: where each cache category comes from

use serde_json::json;

use super::entity::EntityRecord;

/// A category fetched from the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSource {
    pub category: &'static str,
    pub endpoint: &'static str,
    /// Key the list is wrapped under in the response
    pub response_key: &'static str,
}

const fn source(category: &'static str, endpoint: &'static str, response_key: &'static str) -> ReferenceSource {
    ReferenceSource { category, endpoint, response_key }
}

pub const REFERENCE_SOURCES: &[ReferenceSource] = &[
    source("customers", "/customers", "customers"),
    source("products", "/products?limit=100", "products"),
    source("inventories", "/inventories", "inventories"),
    source("categories", "/categories", "categories"),
    source("units", "/product_unit_types", "product_unit_types"),
    source("vendors", "/vendors", "vendors"),
    source("accounts", "/accounts", "accounts"),
    source("invoices", "/invoices", "invoices"),
    source("bills", "/bills", "bills"),
    source("simple_bills", "/simple_bills", "simple_bills"),
];

/// Categories loaded by a bare `refresh`, matching the operator's initial load
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "customers",
    "products",
    "inventories",
    "categories",
    "units",
    "vendors",
    "accounts",
];

pub fn source_for(category: &str) -> Option<&'static ReferenceSource> {
    REFERENCE_SOURCES.iter().find(|s| s.category == category)
}

/// Categories served from local seeds instead of the API
pub const SEEDED_CATEGORIES: [&str; 2] = ["taxes", "statuses"];

/// Locally seeded records for the static categories (`taxes`, `statuses`)
pub fn static_seed(category: &str) -> Option<Vec<EntityRecord>> {
    let values = match category {
        "taxes" => vec![
            json!({"id": 1, "name": "15% VAT", "name_ar": "15% ضريبة القيمة المضافة", "value": 15}),
            json!({"id": 2, "name": "0% VAT", "name_ar": "0% ضريبة القيمة المضافة", "value": 0}),
            json!({"id": 3, "name": "Tax Exempt", "name_ar": "معفى من الضريبة", "value": 0}),
        ],
        "statuses" => vec![
            json!({"id": "Draft", "name": "Draft", "name_ar": "مسودة"}),
            json!({"id": "Approved", "name": "Approved", "name_ar": "معتمد"}),
        ],
        _ => return None,
    };
    Some(values.iter().filter_map(EntityRecord::from_json).collect())
}

fn first_segment(endpoint: &str) -> &str {
    endpoint
        .trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .unwrap_or_default()
}

/// Category whose source endpoint names the same collection as `endpoint`
pub fn category_for_endpoint(endpoint: &str) -> Option<&'static str> {
    let segment = first_segment(endpoint);
    if segment.is_empty() {
        return None;
    }
    REFERENCE_SOURCES
        .iter()
        .find(|s| first_segment(s.endpoint) == segment)
        .map(|s| s.category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_for_endpoint() {
        assert_eq!(category_for_endpoint("/products?limit=100"), Some("products"));
        assert_eq!(category_for_endpoint("/product_unit_types"), Some("units"));
        assert_eq!(category_for_endpoint("/customers/12"), Some("customers"));
        assert_eq!(category_for_endpoint("/invoice_payments"), None);
        assert_eq!(category_for_endpoint("/"), None);
    }

    #[test]
    fn test_static_seeds() {
        let taxes = static_seed("taxes").unwrap();
        assert_eq!(taxes.len(), 3);
        assert_eq!(taxes[0].label, "15% VAT");
        assert_eq!(taxes[0].attr("value"), Some(&serde_json::json!(15)));
        assert_eq!(static_seed("statuses").unwrap()[1].id_string(), "Approved");
        assert!(static_seed("customers").is_none());
    }
}
