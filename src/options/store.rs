//! Key/value persistence for options and camera poses
//!
//! Values are stored as JSON text under flat string keys. The file-backed store keeps
//! one JSON object in the platform config directory and writes it through on every set.

use anyhow::Context;
use bevy::prelude::*;
use directories::ProjectDirs;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const STORE_FILE: &str = "explore.json";

/// Read/write port used by the options store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()>;
}

/// In-memory store, used in tests and as a fallback when no config dir is available.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON-file store
pub struct FileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl FileStore {
    /// Open the store in the platform config directory:
    /// - Linux: ~/.config/explore-orbits/
    /// - macOS: ~/Library/Application Support/explore-orbits/
    /// - Windows: %APPDATA%\explore-orbits\config\
    pub fn new() -> anyhow::Result<Self> {
        let proj_dirs = ProjectDirs::from("", "", "explore-orbits")
            .ok_or_else(|| anyhow::anyhow!("Failed to resolve config directory"))?;
        Self::new_in_dir(proj_dirs.config_dir().to_path_buf())
    }

    /// Open the store rooted at a specific directory (tests, portable setups).
    pub fn new_in_dir(dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating config dir {}", dir.display()))?;
        let path = dir.join(STORE_FILE);

        let values = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!("Ignoring unreadable option store at {}", path.display());
                    Map::new()
                }
            }
        } else {
            Map::new()
        };

        Ok(Self { path, values })
    }

    fn flush(&self) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.to_string())
    }

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        // Keep structured JSON in the file when the value parses; raw strings otherwise.
        let parsed = serde_json::from_str(&value).unwrap_or(Value::String(value));
        if self.values.get(key) == Some(&parsed) {
            return Ok(());
        }
        self.values.insert(key.to_string(), parsed);
        self.flush()
    }
}

/// Open the platform store, falling back to memory so the scene still runs.
pub fn open_default_store() -> Box<dyn KeyValueStore> {
    match FileStore::new() {
        Ok(store) => {
            info!("Options stored at {}", store.path.display());
            Box::new(store)
        }
        Err(err) => {
            warn!("Option persistence disabled: {err:#}");
            Box::new(MemoryStore::new())
        }
    }
}
