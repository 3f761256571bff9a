//! Common test utilities for flowsim integration tests
//!
//! This module provides shared test infrastructure including:
//! - Sessions pointed at a wiremock upstream
//! - CLI invocation with an isolated config directory
//! - Canned upstream payloads

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use flowsim::catalog::builtin_catalog;
use flowsim::cli::SecretString;
use flowsim::engine::{Credentials, Executor, Session};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const TEST_KEY: &str = "test-api-key";

/// Credentials for a mock upstream
pub fn credentials(base_url: &str) -> Credentials {
    Credentials::new(Some(SecretString(TEST_KEY.to_string())), base_url)
}

/// Session on the built-in catalog, positioned on `workflow` / `scenario`
pub fn session(base_url: &str, workflow: &str, scenario: Option<&str>) -> Session {
    let mut session = Session::new(builtin_catalog(), credentials(base_url));
    session
        .select_workflow(workflow, scenario)
        .expect("built-in workflow");
    session
}

pub fn executor() -> Executor {
    Executor::new(Duration::from_secs(5)).expect("http client")
}

pub fn customers_payload() -> Value {
    json!({"customers": [
        {"id": 5, "name": "Acme Trading", "email": "buyer@acme.test"},
        {"id": 6, "name_en": "Gulf Supplies"}
    ]})
}

pub fn products_payload() -> Value {
    json!({"products": [
        {"id": 11, "name_en": "Widget", "selling_price": "120.5", "buying_price": "80", "tax_id": 1},
        {"id": 12, "name_ar": "خدمة تركيب", "selling_price": 300, "tax_id": 3}
    ]})
}

/// Isolated config directory for CLI runs
pub struct TestEnv {
    pub config_dir: TempDir,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        Self { config_dir: TempDir::new().expect("Failed to create temp config dir") }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().to_path_buf()
    }

    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config_dir.path().join("config.toml"), content).expect("write config");
    }

    pub fn state(&self) -> Option<Value> {
        let text = std::fs::read_to_string(self.config_dir.path().join("state.json")).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// The flowsim binary with a clean environment rooted at this config dir
    pub fn flowsim(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(env!("CARGO_BIN_EXE_flowsim"));
        cmd.env("FLOWSIM_CONFIG_DIR", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("FLOWSIM_API_KEY")
            .env_remove("FLOWSIM_BASE_URL")
            .env_remove("FLOWSIM_LOG");
        cmd
    }
}
