//! Cross-step reference data

pub mod entity;
pub mod sources;

pub use entity::{extract_list, EntityCache, EntityRecord, LoadSummary};
pub use sources::{category_for_endpoint, ReferenceSource, DEFAULT_CATEGORIES, REFERENCE_SOURCES};
