//! Persisted operator state: the API key and a custom base URL
//!
//! Stored as a flat JSON object under fixed keys and written atomically.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::cli::SecretString;
use crate::errors::FlowsimError;

pub const API_KEY: &str = "api_key";
pub const API_BASE_URL: &str = "api_base_url";

/// Key-value store backed by one JSON file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl StateStore {
    /// Open the store; a missing file is an empty store
    pub fn open(path: &Path) -> Result<Self, FlowsimError> {
        let values = if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| FlowsimError::Store(format!("Failed to read {}: {}", path.display(), e)))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| FlowsimError::Store(format!("Corrupt state file {}: {}", path.display(), e)))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path: path.to_path_buf(), values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn api_key(&self) -> Option<SecretString> {
        self.get(API_KEY).map(|k| SecretString(k.to_string()))
    }

    pub fn base_url(&self) -> Option<&str> {
        self.get(API_BASE_URL)
    }

    /// Write the store atomically with owner-only permissions
    pub fn save(&self) -> Result<(), FlowsimError> {
        let parent = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| FlowsimError::Store(format!("Failed to create config directory: {}", e)))?;

        let content = serde_json::to_string_pretty(&self.values)
            .map_err(|e| FlowsimError::Store(format!("Failed to serialize state: {}", e)))?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|e| FlowsimError::Store(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| FlowsimError::Store(format!("Failed to write state: {}", e)))?;
        temp.persist(&self.path)
            .map_err(|e| FlowsimError::Store(format!("Failed to save state: {}", e)))?;

        // the file holds the API key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(&dir.path().join("state.json")).unwrap();
        assert!(store.api_key().is_none());
        assert!(store.base_url().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = StateStore::open(&path).unwrap();
        store.set(API_KEY, "secret-key");
        store.set(API_BASE_URL, "https://sandbox.example.test/2.0");
        store.save().unwrap();

        let reloaded = StateStore::open(&path).unwrap();
        assert_eq!(reloaded.api_key().unwrap().as_str(), "secret-key");
        assert_eq!(reloaded.base_url(), Some("https://sandbox.example.test/2.0"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_remove_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = StateStore::open(&path).unwrap();
        store.set(API_KEY, "k");
        assert!(store.remove(API_KEY));
        assert!(!store.remove(API_KEY));
        assert!(store.api_key().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{oops").unwrap();
        assert!(StateStore::open(&path).is_err());
    }
}
