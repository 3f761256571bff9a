//! flowsim library interface
//!
//! Steps through multi-step business workflows (product setup, order to
//! invoice, payments, purchasing, dropshipping) against an accounting REST
//! API, one editable request at a time or as a stop-on-failure run.
//!
//! # Module Organization
//!
//! - [`catalog`] - Workflow definitions (built-in and YAML/TOML files)
//! - [`engine`] - Scenario resolution, drafts, request synthesis, execution, run-all
//! - [`cache`] - Reference data (customers, products, accounts...) for form options
//! - [`config`] - Config file and persisted API key / base URL
//! - [`output`] - Terminal styling, reports, cURL rendering
//! - [`signals`] - Ctrl+C handling
//! - [`errors`] - Error types (FlowsimError, ValidationError, Result)
//! - [`status`] - Exit status codes (ExitStatus)
//! - [`core`] - Subcommand dispatch

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod engine;
pub mod errors;
pub mod output;
pub mod signals;
pub mod status;
