//! Execution environment: terminal capabilities and the config location

use std::path::PathBuf;

/// Overrides the config directory (used by tests and portable setups)
pub const CONFIG_DIR_ENV: &str = "FLOWSIM_CONFIG_DIR";

/// Execution environment
#[derive(Debug, Clone)]
pub struct Environment {
    pub stdout_isatty: bool,
    pub stderr_isatty: bool,
    pub colors: bool,
    pub config_dir: PathBuf,
}

impl Environment {
    pub fn init() -> Self {
        Self::default()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            stdout_isatty: atty::is(atty::Stream::Stdout),
            stderr_isatty: atty::is(atty::Stream::Stderr),
            colors: detect_color_support(),
            config_dir: default_config_dir(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|p| p.join("flowsim"))
        .unwrap_or_else(|| PathBuf::from(".flowsim"))
}

/// Colors only on a terminal, and never with NO_COLOR or TERM=dumb
fn detect_color_support() -> bool {
    if !atty::is(atty::Stream::Stdout) {
        return false;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    !matches!(std::env::var("TERM").as_deref(), Ok("dumb"))
}
