//! Single HTTP call execution
//!
//! The executor never fails past its caller: transport failures become an
//! outcome with status 0 and a `TransportError` payload.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use super::synth::{RequestBody, SynthesizedRequest, API_KEY_HEADER};
use crate::errors::{FlowsimError, Result};

const USER_AGENT_STRING: &str = concat!("flowsim/", env!("CARGO_PKG_VERSION"));

/// Parsed response body, tagged by how it was interpreted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponsePayload {
    Json(JsonValue),
    Text(String),
    TransportError(String),
}

impl ResponsePayload {
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            ResponsePayload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Human-readable rendering for terminals and reports
    pub fn render(&self) -> String {
        match self {
            ResponsePayload::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponsePayload::Text(text) => text.clone(),
            ResponsePayload::TransportError(message) => message.clone(),
        }
    }
}

/// Pagination headers relayed by the upstream API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
}

impl Pagination {
    fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };
        Self {
            total_count: number("x-total-count"),
            total_pages: number("x-total-pages"),
            current_page: number("x-current-page"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_count.is_none() && self.total_pages.is_none() && self.current_page.is_none()
    }
}

/// Result of one executed request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    /// HTTP status, 0 when no response was received
    pub status: u16,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub payload: ResponsePayload,
    #[serde(skip_serializing_if = "Pagination::is_empty")]
    pub pagination: Pagination,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl ExecutionOutcome {
    pub fn new(status: u16, duration: Duration, payload: ResponsePayload) -> Self {
        Self { status, duration, payload, pagination: Pagination::default() }
    }

    pub fn transport_error(duration: Duration, message: impl Into<String>) -> Self {
        Self::new(0, duration, ResponsePayload::TransportError(message.into()))
    }

    /// Success is a status in `200..300`
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Performs synthesized requests with one shared HTTP client
#[derive(Debug, Clone)]
pub struct Executor {
    client: Client,
}

impl Executor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT_STRING)
            .timeout(timeout)
            .build()
            .map_err(FlowsimError::Request)?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn execute(&self, request: &SynthesizedRequest) -> ExecutionOutcome {
        let method = match Method::from_bytes(request.method.as_bytes()) {
            Ok(method) => method,
            Err(e) => return ExecutionOutcome::transport_error(Duration::ZERO, format!("Invalid method: {}", e)),
        };

        debug!(method = %method, url = %request.url, "Sending request");

        let mut builder = self
            .client
            .request(method, request.url.clone())
            .header(API_KEY_HEADER, request.api_key().as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if let Some(ref body) = request.body {
            builder = match body {
                RequestBody::Json(value) => builder.body(value.to_string()),
                RequestBody::Raw(text) => builder.body(text.clone()),
            };
        }

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let elapsed = start.elapsed();
                warn!(url = %request.url, error = %e, "Request failed before a response arrived");
                return ExecutionOutcome::transport_error(elapsed, e.to_string());
            }
        };

        let status = response.status().as_u16();
        let pagination = Pagination::from_headers(response.headers());
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);

        let payload = match response.text().await {
            Ok(text) if is_json => match serde_json::from_str(&text) {
                Ok(value) => ResponsePayload::Json(value),
                Err(_) => ResponsePayload::Text(text),
            },
            Ok(text) => ResponsePayload::Text(text),
            Err(e) => ResponsePayload::TransportError(format!("Failed to read response body: {}", e)),
        };
        let elapsed = start.elapsed();

        info!(status, duration_ms = elapsed.as_millis() as u64, url = %request.url, "Request completed");

        ExecutionOutcome { status, duration: elapsed, payload, pagination }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_success_classification() {
        let ok = ExecutionOutcome::new(201, Duration::from_millis(3), ResponsePayload::Json(json!({})));
        let bad = ExecutionOutcome::new(300, Duration::from_millis(3), ResponsePayload::Text(String::new()));
        let net = ExecutionOutcome::transport_error(Duration::ZERO, "connection refused");
        assert!(ok.is_success());
        assert!(!bad.is_success());
        assert!(!net.is_success());
        assert_eq!(net.status, 0);
    }

    #[test]
    fn test_pagination_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-total-count", HeaderValue::from_static("120"));
        headers.insert("x-current-page", HeaderValue::from_static("2"));
        let pagination = Pagination::from_headers(&headers);
        assert_eq!(pagination.total_count, Some(120));
        assert_eq!(pagination.total_pages, None);
        assert_eq!(pagination.current_page, Some(2));
    }

    #[test]
    fn test_outcome_serializes_tagged_payload() {
        let outcome = ExecutionOutcome::new(200, Duration::from_millis(12), ResponsePayload::Text("ok".into()));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["duration_ms"], 12);
        assert_eq!(value["payload"], json!({"kind": "text", "value": "ok"}));
        assert!(value.get("pagination").is_none());
    }
}
