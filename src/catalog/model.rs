//! Workflow catalog data model
//!
//! Workflows are immutable descriptions: scenarios, ordered steps, body
//! templates and the descriptors of operator-editable fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Display language for catalog text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "ar" | "arabic" => Ok(Language::Ar),
            other => Err(format!("unsupported language '{}' (use en or ar)", other)),
        }
    }
}

/// Text available in Arabic and English
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub ar: String,
    #[serde(default)]
    pub en: String,
}

impl LocalizedText {
    pub fn new(ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self { ar: ar.into(), en: en.into() }
    }

    /// Text in the requested language, falling back to the other one when empty
    pub fn get(&self, lang: Language) -> &str {
        let (primary, fallback) = match lang {
            Language::Ar => (&self.ar, &self.en),
            Language::En => (&self.en, &self.ar),
        };
        if primary.is_empty() { fallback } else { primary }
    }

    pub fn is_empty(&self) -> bool {
        self.ar.is_empty() && self.en.is_empty()
    }
}

/// A named ordered sequence of API steps simulating one business process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,

    pub name: LocalizedText,

    #[serde(default, skip_serializing_if = "LocalizedText::is_empty")]
    pub description: LocalizedText,

    /// Variants that include or exclude conditional steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<Scenario>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InfoBox>,

    pub steps: Vec<Step>,
}

impl Workflow {
    /// The scenario selected when the operator has not picked one
    pub fn default_scenario(&self) -> Option<&str> {
        self.scenarios.first().map(|s| s.id.as_str())
    }

    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub label: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoKind {
    #[default]
    Note,
    Warning,
    Success,
}

/// Informational note shown above a workflow's steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoBox {
    #[serde(default)]
    pub kind: InfoKind,
    pub title: LocalizedText,
    pub text: LocalizedText,
}

/// One HTTP operation with a template body and editable fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique within the owning workflow
    pub id: String,

    pub name: LocalizedText,

    #[serde(default, skip_serializing_if = "LocalizedText::is_empty")]
    pub description: LocalizedText,

    #[serde(default = "default_method")]
    pub method: String,

    /// Path relative to the API base; may contain `{id}` and a query string
    pub endpoint: String,

    /// Scenario id this step belongs to; absent means always visible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Declared query parameters, appended in order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub query: IndexMap<String, String>,

    /// Body template (nested JSON object)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDescriptor>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Step {
    pub fn new(id: &str, name: LocalizedText, method: &str, endpoint: &str) -> Self {
        Self {
            id: id.to_string(),
            name,
            description: LocalizedText::default(),
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            condition: None,
            query: IndexMap::new(),
            body: None,
            fields: Vec::new(),
        }
    }

    pub fn describe(mut self, description: LocalizedText) -> Self {
        self.description = description;
        self
    }

    pub fn when(mut self, scenario: &str) -> Self {
        self.condition = Some(scenario.to_string());
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }

    /// Whether this step is visible under the given scenario
    pub fn is_visible(&self, scenario: Option<&str>) -> bool {
        match self.condition.as_deref() {
            None => true,
            Some(condition) => scenario == Some(condition),
        }
    }

    /// Methods that carry a request body
    pub fn sends_body(&self) -> bool {
        self.body.is_some()
            && matches!(self.method.to_ascii_uppercase().as_str(), "POST" | "PUT" | "PATCH")
    }

    /// Whether the endpoint needs an operator-supplied resource id
    pub fn needs_resource_id(&self) -> bool {
        self.endpoint.contains("{id}")
    }

    /// GET without a resource id: a list-style operation
    pub fn is_list(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET") && !self.needs_resource_id()
    }

    /// The descriptor of the line-items editor, if the step has one
    pub fn line_items_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.kind == FieldKind::LineItems)
    }

    pub fn field(&self, path: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.path == path)
    }
}

/// UI type tag of an editable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Number,
    Date,
    Select,
    Checkbox,
    Textarea,
    LineItems,
}

/// Describes one operator-editable value inside a body template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Explicit path into the body template, e.g. `invoice.line_items`
    pub path: String,

    pub label: LocalizedText,

    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    /// EntityCache category supplying selectable values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<LocalizedText>,
}

impl FieldDescriptor {
    pub fn new(path: &str, kind: FieldKind, label: LocalizedText) -> Self {
        Self {
            path: path.to_string(),
            label,
            kind,
            required: false,
            source: None,
            hint: None,
        }
    }

    pub fn text(path: &str, ar: &str, en: &str) -> Self {
        Self::new(path, FieldKind::Text, LocalizedText::new(ar, en))
    }

    pub fn number(path: &str, ar: &str, en: &str) -> Self {
        Self::new(path, FieldKind::Number, LocalizedText::new(ar, en))
    }

    pub fn date(path: &str, ar: &str, en: &str) -> Self {
        Self::new(path, FieldKind::Date, LocalizedText::new(ar, en))
    }

    pub fn select(path: &str, ar: &str, en: &str, source: &str) -> Self {
        let mut field = Self::new(path, FieldKind::Select, LocalizedText::new(ar, en));
        field.source = Some(source.to_string());
        field
    }

    pub fn line_items(path: &str, ar: &str, en: &str) -> Self {
        let mut field = Self::new(path, FieldKind::LineItems, LocalizedText::new(ar, en));
        field.source = Some("products".to_string());
        field
    }

    pub fn of_kind(path: &str, kind: FieldKind, ar: &str, en: &str) -> Self {
        Self::new(path, kind, LocalizedText::new(ar, en))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hint(mut self, ar: &str, en: &str) -> Self {
        self.hint = Some(LocalizedText::new(ar, en));
        self
    }

    /// Final segment of the path, e.g. `contact_id` for `invoice.contact_id`
    pub fn name(&self) -> &str {
        let tail = self.path.rsplit(['.', '[']).next().unwrap_or(&self.path);
        tail.trim_end_matches(']')
    }
}
