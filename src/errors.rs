//! Error types for flowsim

use thiserror::Error;

/// Main error type for flowsim
#[derive(Error, Debug)]
pub enum FlowsimError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("State store error: {0}")]
    Store(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Local failures caught before any request is sent.
///
/// None of these reach the network; the operator fixes the input and retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("Missing required path parameter '{name}'")]
    MissingPathParam { name: String },

    #[error("Invalid request URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Request body is not valid JSON: {message}")]
    MalformedBody { message: String },

    #[error("Unknown workflow '{0}'")]
    UnknownWorkflow(String),

    #[error("Unknown scenario '{scenario}' for workflow '{workflow}'")]
    UnknownScenario { workflow: String, scenario: String },

    #[error("Unknown step '{0}'")]
    UnknownStep(String),

    #[error("Step index {index} is out of range ({len} visible steps)")]
    StepOutOfRange { index: usize, len: usize },

    #[error("Invalid field path '{path}': {message}")]
    InvalidFieldPath { path: String, message: String },

    #[error("Field '{0}' is not a line-items field")]
    NotLineItems(String),

    #[error("Line item row {row} does not exist ({len} rows)")]
    RowOutOfRange { row: usize, len: usize },

    #[error("Invalid value for '{field}': {message}")]
    InvalidFieldValue { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, FlowsimError>;
