//! Request synthesis
//!
//! Turns a step plus the operator's draft into a concrete request: method,
//! URL with path id and query, headers and body.

use serde_json::Value as JsonValue;
use url::Url;

use super::draft::StepDraft;
use crate::catalog::Step;
use crate::cli::SecretString;
use crate::errors::ValidationError;

/// Header carrying the opaque API key
pub const API_KEY_HEADER: &str = "API-KEY";

/// Shown in previews when no key is configured
pub const API_KEY_PLACEHOLDER: &str = "your-api-key";

pub const DEFAULT_BASE_URL: &str = "https://api.qoyod.com/2.0";

/// Default pagination for list-style steps without their own query
const DEFAULT_PAGINATION: [(&str, &str); 2] = [("page", "1"), ("per_page", "25")];

/// Credential and target of the remote API
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: Option<SecretString>,
    pub base_url: String,
}

impl Credentials {
    pub fn new(api_key: Option<SecretString>, base_url: impl Into<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        Self { api_key, base_url: base_url.into() }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(None, DEFAULT_BASE_URL)
    }
}

/// Body of a synthesized request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Built from the form-mode working copy
    Json(JsonValue),
    /// Verbatim raw-editor text, already checked to be valid JSON
    Raw(String),
}

impl RequestBody {
    pub fn to_text(&self) -> String {
        match self {
            RequestBody::Json(value) => value.to_string(),
            RequestBody::Raw(text) => text.clone(),
        }
    }

    pub fn to_pretty(&self) -> String {
        match self {
            RequestBody::Json(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            RequestBody::Raw(text) => text.clone(),
        }
    }
}

/// A concrete, executable request
#[derive(Debug, Clone)]
pub struct SynthesizedRequest {
    pub method: String,
    pub url: Url,
    api_key: SecretString,
    pub body: Option<RequestBody>,
}

impl SynthesizedRequest {
    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// Request headers; the key is replaced by the placeholder when `redact` is set
    pub fn headers(&self, redact: bool) -> Vec<(&'static str, String)> {
        let key = if redact { API_KEY_PLACEHOLDER.to_string() } else { self.api_key.as_str().to_string() };
        vec![
            (API_KEY_HEADER, key),
            ("Content-Type", "application/json".to_string()),
            ("Accept", "application/json".to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// A missing key is a validation error
    Require,
    /// A missing key is replaced by a placeholder (offline preview)
    Placeholder,
}

/// Builds requests for steps against one set of credentials
pub struct RequestSynthesizer<'a> {
    credentials: &'a Credentials,
    key_policy: KeyPolicy,
}

impl<'a> RequestSynthesizer<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self { credentials, key_policy: KeyPolicy::Require }
    }

    pub fn preview(credentials: &'a Credentials) -> Self {
        Self { credentials, key_policy: KeyPolicy::Placeholder }
    }

    fn api_key(&self) -> Result<SecretString, ValidationError> {
        match (&self.credentials.api_key, self.key_policy) {
            (Some(key), _) => Ok(key.clone()),
            (None, KeyPolicy::Placeholder) => Ok(SecretString(API_KEY_PLACEHOLDER.to_string())),
            (None, KeyPolicy::Require) => Err(ValidationError::MissingApiKey),
        }
    }

    /// Synthesize the request for `step` from the operator's draft
    pub fn synthesize(&self, step: &Step, draft: &StepDraft) -> Result<SynthesizedRequest, ValidationError> {
        let api_key = self.api_key()?;
        let url = self.build_url(step, draft)?;
        let body = draft.request_body(step)?;

        Ok(SynthesizedRequest {
            method: step.method.to_ascii_uppercase(),
            url,
            api_key,
            body,
        })
    }

    /// GET request for a reference-data endpoint (no pagination added)
    pub fn reference_request(&self, endpoint: &str) -> Result<SynthesizedRequest, ValidationError> {
        let api_key = self.api_key()?;
        let url = self.join(endpoint)?;
        Ok(SynthesizedRequest { method: "GET".to_string(), url, api_key, body: None })
    }

    fn join(&self, endpoint: &str) -> Result<Url, ValidationError> {
        let raw = format!("{}{}", self.credentials.base_url.trim_end_matches('/'), endpoint);
        Url::parse(&raw).map_err(|e| ValidationError::InvalidUrl { url: raw.clone(), message: e.to_string() })
    }

    /// Base URL + endpoint with `{id}` substituted and query appended
    pub fn build_url(&self, step: &Step, draft: &StepDraft) -> Result<Url, ValidationError> {
        let endpoint = if step.needs_resource_id() {
            let id = draft
                .resource_id()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ValidationError::MissingPathParam { name: "id".to_string() })?;
            step.endpoint.replace("{id}", id)
        } else {
            step.endpoint.clone()
        };

        let mut url = self.join(&endpoint)?;

        // inline endpoint query first, so overrides replace rather than repeat it
        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let has_inline_query = !pairs.is_empty();
        url.set_query(None);

        if !step.query.is_empty() {
            pairs.extend(step.query.iter().map(|(k, v)| (k.clone(), v.clone())));
        } else if step.is_list() && !has_inline_query {
            pairs.extend(DEFAULT_PAGINATION.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        }

        for (key, value) in draft.query_overrides() {
            match pairs.iter_mut().find(|(k, _)| k == key) {
                Some(pair) => pair.1 = value.clone(),
                None => pairs.push((key.clone(), value.clone())),
            }
        }

        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }
}
