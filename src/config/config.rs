//! Config file handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::Language;
use crate::context::Environment;
use crate::engine::{DEFAULT_BASE_URL, DEFAULT_RUN_DELAY};
use crate::errors::FlowsimError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// flowsim configuration from `config.toml`
#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub base_url: Option<String>,
    pub language: Language,
    pub run_delay: Duration,
    pub timeout: Duration,
    pub catalog: Option<PathBuf>,
}

impl Config {
    fn defaults(config_dir: PathBuf) -> Self {
        Self {
            config_dir,
            base_url: None,
            language: Language::default(),
            run_delay: DEFAULT_RUN_DELAY,
            timeout: DEFAULT_TIMEOUT,
            catalog: None,
        }
    }

    /// Load configuration from the config file (TOML format)
    pub fn load(env: &Environment) -> Result<Self, FlowsimError> {
        let config_dir = env.config_dir.clone();
        let config_file = config_dir.join("config.toml");

        if !config_file.exists() {
            return Ok(Self::defaults(config_dir));
        }

        let content = std::fs::read_to_string(&config_file)
            .map_err(|e| FlowsimError::Config(format!("Failed to read config: {}", e)))?;
        Self::parse(&content, config_dir)
    }

    /// Parse config text; every key is optional
    pub fn parse(content: &str, config_dir: PathBuf) -> Result<Self, FlowsimError> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| FlowsimError::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::defaults(config_dir);
        let Some(defaults) = toml_value.get("defaults") else {
            return Ok(config);
        };
        let string = |key: &str| defaults.get(key).and_then(|v| v.as_str());

        if let Some(base_url) = string("base_url").filter(|s| !s.trim().is_empty()) {
            config.base_url = Some(base_url.trim().to_string());
        }
        if let Some(language) = string("language") {
            config.language = language.parse().map_err(FlowsimError::Config)?;
        }
        if let Some(delay) = string("run_delay") {
            config.run_delay = parse_duration("run_delay", delay)?;
        }
        if let Some(timeout) = string("timeout") {
            config.timeout = parse_duration("timeout", timeout)?;
        }
        if let Some(catalog) = string("catalog") {
            config.catalog = Some(config.resolve(Path::new(catalog)));
        }

        Ok(config)
    }

    /// Resolve relative paths against the config dir
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Path of the persisted operator state
    pub fn state_file(&self) -> PathBuf {
        self.config_dir.join("state.json")
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, FlowsimError> {
    humantime::parse_duration(value.trim())
        .map_err(|e| FlowsimError::Config(format!("Invalid {} '{}': {}", key, value, e)))
}
