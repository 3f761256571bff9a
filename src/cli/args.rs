//! CLI argument definitions using clap
//!
//! This module defines the command-line surface of flowsim: global
//! credential and display flags, one subcommand per operator action, and the
//! draft edit flags shared by `preview` and `run`.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::Language;

/// A string that redacts its value in Debug output to prevent credential leakage
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(pub String);

impl SecretString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "SecretString(\"\")")
        } else {
            write!(f, "SecretString(\"[REDACTED]\")")
        }
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "")
        } else {
            write!(f, "[REDACTED]")
        }
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString(s)
    }
}

impl std::str::FromStr for SecretString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SecretString(s.to_string()))
    }
}

impl AsRef<str> for SecretString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for SecretString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// flowsim - step through and run accounting API workflows from the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "flowsim", version, about, long_about = None)]
pub struct Cli {
    /// API key sent in the API-KEY header (overrides the saved key)
    #[arg(long = "api-key", value_name = "KEY", env = "FLOWSIM_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<SecretString>,

    /// API base URL (overrides the saved and configured base URL)
    #[arg(long = "base-url", value_name = "URL", env = "FLOWSIM_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Display language for catalog text
    #[arg(long = "lang", value_name = "LANG", value_enum, global = true)]
    pub lang: Option<Language>,

    /// Load workflows from a YAML or TOML catalog instead of the built-in one
    #[arg(long = "catalog", value_name = "FILE", global = true)]
    pub catalog: Option<PathBuf>,

    /// Log line format on stderr
    #[arg(long = "log-format", value_name = "FORMAT", value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the workflows in the catalog
    #[command(name = "workflows")]
    Workflows,

    /// Show the visible steps of a workflow for a scenario
    #[command(name = "steps")]
    Steps(TargetArgs),

    /// Show the request a step would send, without sending it
    #[command(name = "preview")]
    Preview(PreviewArgs),

    /// Execute one step, or every visible step in order
    #[command(name = "run")]
    Run(RunArgs),

    /// Reload reference data (customers, products, accounts...)
    #[command(name = "refresh")]
    Refresh {
        /// Categories to reload (defaults to the standard set)
        #[arg(value_name = "CATEGORY")]
        categories: Vec<String>,
    },

    /// Inspect or change the saved API key and base URL
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Workflow and scenario selection
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Workflow id (see `flowsim workflows`)
    #[arg(value_name = "WORKFLOW")]
    pub workflow: String,

    /// Scenario id (defaults to the workflow's first scenario)
    #[arg(short = 's', long = "scenario", value_name = "SCENARIO")]
    pub scenario: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Step id (defaults to the first visible step)
    #[arg(long = "step", value_name = "STEP")]
    pub step: Option<String>,

    #[command(flatten)]
    pub edits: EditArgs,

    /// Also print an equivalent curl command
    #[arg(long = "curl", action = ArgAction::SetTrue)]
    pub curl: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Execute only this step; without it every visible step runs in order
    #[arg(long = "step", value_name = "STEP")]
    pub step: Option<String>,

    #[command(flatten)]
    pub edits: EditArgs,

    /// Pause between steps of a full run (e.g. 500ms, 2s)
    #[arg(long = "delay", value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub delay: Option<Duration>,

    /// Print results as JSON lines
    #[arg(long = "json", action = ArgAction::SetTrue)]
    pub json: bool,
}

/// Draft edits applied before synthesizing.
///
/// Every value may carry a `STEP:` prefix; without one it targets the
/// selected step.
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Set a body field: [STEP:]PATH=VALUE (e.g. invoice.line_items[0].quantity=2)
    #[arg(long = "set", value_name = "[STEP:]PATH=VALUE")]
    pub set: Vec<String>,

    /// Append a blank line item: [STEP:]PATH
    #[arg(long = "add-row", value_name = "[STEP:]PATH")]
    pub add_row: Vec<String>,

    /// Remove a line item: [STEP:]PATH[N]
    #[arg(long = "remove-row", value_name = "[STEP:]PATH[N]")]
    pub remove_row: Vec<String>,

    /// Send a file's contents as the raw JSON body: [STEP:]FILE
    #[arg(long = "raw-body", value_name = "[STEP:]FILE")]
    pub raw_body: Vec<String>,

    /// Resource id for endpoints containing {id}: [STEP:]ID
    #[arg(long = "id", value_name = "[STEP:]ID")]
    pub id: Vec<String>,

    /// Query parameter override: [STEP:]KEY=VALUE
    #[arg(long = "query", value_name = "[STEP:]KEY=VALUE")]
    pub query: Vec<String>,

    /// Fill empty fields with test values: [STEP] (selected step when empty)
    #[arg(long = "fill", value_name = "STEP", num_args = 0..=1, default_missing_value = "")]
    pub fill: Vec<String>,
}

impl EditArgs {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.add_row.is_empty()
            && self.remove_row.is_empty()
            && self.raw_body.is_empty()
            && self.id.is_empty()
            && self.query.is_empty()
            && self.fill.is_empty()
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Save the API key
    SetKey {
        #[arg(value_name = "KEY")]
        key: SecretString,
    },
    /// Forget the saved API key
    ClearKey,
    /// Save a custom API base URL
    SetBaseUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

/// Log format for structured output (CI/CD)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Plain text output (default)
    #[default]
    Text,
    /// JSON Lines format for parsing
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_redacts() {
        let secret = SecretString("abc123".into());
        assert_eq!(format!("{:?}", secret), "SecretString(\"[REDACTED]\")");
        assert_eq!(secret.to_string(), "[REDACTED]");
        assert_eq!(secret.as_str(), "abc123");
        assert!(SecretString("  ".into()).is_blank());
    }

    #[test]
    fn test_parse_run_with_edits() {
        let cli = Cli::try_parse_from([
            "flowsim",
            "run",
            "order-processing",
            "--scenario",
            "new-customer",
            "--set",
            "create-customer:contact.name=Acme",
            "--query",
            "q[email_eq]=a@b.c",
            "--delay",
            "250ms",
            "--json",
        ])
        .unwrap();

        let Command::Run(run) = cli.command else { panic!("expected run") };
        assert_eq!(run.target.workflow, "order-processing");
        assert_eq!(run.target.scenario.as_deref(), Some("new-customer"));
        assert_eq!(run.edits.set, vec!["create-customer:contact.name=Acme"]);
        assert_eq!(run.delay, Some(Duration::from_millis(250)));
        assert!(run.json);
        assert!(run.step.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["flowsim", "workflows", "--lang", "ar", "-vv"]).unwrap();
        assert_eq!(cli.lang, Some(Language::Ar));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_fill_without_value() {
        let cli = Cli::try_parse_from(["flowsim", "preview", "invoice-creation", "--fill"]).unwrap();
        let Command::Preview(preview) = cli.command else { panic!("expected preview") };
        assert_eq!(preview.edits.fill, vec![String::new()]);
        assert!(!preview.edits.is_empty());
    }

    #[test]
    fn test_config_set_key() {
        let cli = Cli::try_parse_from(["flowsim", "config", "set-key", "k-1"]).unwrap();
        match cli.command {
            Command::Config { action: ConfigAction::SetKey { key } } => assert_eq!(key.as_str(), "k-1"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
