//! Configuration and persisted operator state

#[allow(clippy::module_inception)]
mod config;
pub mod store;

pub use config::Config;
pub use store::StateStore;
