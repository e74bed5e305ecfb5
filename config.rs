use crate::history::HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "homesync";
const DATA_DIR_ENV: &str = "HOMESYNC_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Prompt history entries kept, 100 unless overridden. The store treats
    /// anything below 1 as 1.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

fn default_history_capacity() -> usize {
    HISTORY_CAPACITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Upper bound on items requested from the model per call.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Completed jobs that may wait for the store before workers block.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_max_items() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    32
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
}

impl Settings {
    /// Reads `settings.json` from the data root; a missing file means defaults.
    pub fn load(paths: &AppPaths) -> Result<Self, crate::error::Error> {
        if !paths.settings_path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&paths.settings_path)?;
        let settings = serde_json::from_str(&raw)?;
        log::info!("Loaded settings from {}", paths.settings_path.display());
        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppPaths {
    pub root: PathBuf,
    pub db_path: PathBuf,
    pub settings_path: PathBuf,
}

impl AppPaths {
    /// Resolves the data root: explicit override, then `HOMESYNC_DATA_DIR`,
    /// then the platform data directory.
    pub fn discover(override_root: Option<&Path>) -> Result<Self, crate::error::Error> {
        let root = match override_root {
            Some(root) => root.to_path_buf(),
            None => default_root()?,
        };
        Self::at(root)
    }

    pub fn at(root: PathBuf) -> Result<Self, crate::error::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            db_path: root.join("inventory.db"),
            settings_path: root.join("settings.json"),
            root,
        })
    }
}

fn default_root() -> Result<PathBuf, crate::error::Error> {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_DIR_NAME));
    }
    env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".local").join("share").join(APP_DIR_NAME))
        .ok_or_else(|| crate::error::Error::Path("Failed to get app data dir".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_keep_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"recognition": {"max_items": 12}}"#).unwrap();
        assert_eq!(settings.recognition.max_items, 12);
        assert_eq!(settings.recognition.queue_capacity, 32);
        assert_eq!(settings.store.history_capacity, HISTORY_CAPACITY);
    }

    #[test]
    fn explicit_root_wins_and_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested");
        let paths = AppPaths::discover(Some(&root)).unwrap();
        assert!(root.is_dir());
        assert_eq!(paths.db_path, root.join("inventory.db"));
        assert!(Settings::load(&paths).is_ok());
    }
}
