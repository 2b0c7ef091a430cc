//! Options store: the persisted configuration every scene system reads.

use bevy::prelude::*;
use serde_json::{Map, Value};

pub mod settings;
pub mod store;

pub use settings::ExploreOptions;
pub use store::{FileStore, KeyValueStore, MemoryStore};

use crate::camera::pose::{CameraPose, LIVE_POSE_KEYS, REFERENCE_POSE_KEYS};

const KEY_PREFIX: &str = "planets_";

/// Storage key for a serialized option field.
pub fn storage_key(field: &str) -> String {
    format!("{KEY_PREFIX}{field}")
}

/// Process-wide options with write-through persistence
#[derive(Resource)]
pub struct OptionsStore {
    options: ExploreOptions,
    backend: Box<dyn KeyValueStore>,
    restart_key: u32,
    reset_key: u32,
}

impl OptionsStore {
    /// Load options from `backend`. Each field that is missing or fails to parse keeps
    /// its default; the others are still applied.
    pub fn load(backend: Box<dyn KeyValueStore>) -> Self {
        let options = load_options(backend.as_ref());
        Self {
            options,
            backend,
            restart_key: 0,
            reset_key: 0,
        }
    }

    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryStore::new()))
    }

    pub fn options(&self) -> &ExploreOptions {
        &self.options
    }

    /// Mutate the options and persist every field that changed.
    pub fn update(&mut self, f: impl FnOnce(&mut ExploreOptions)) {
        let before = serde_json::to_value(&self.options).ok();
        f(&mut self.options);
        let after = serde_json::to_value(&self.options).ok();

        let (Some(Value::Object(before)), Some(Value::Object(after))) = (before, after) else {
            return;
        };
        for (field, value) in after {
            if before.get(&field) == Some(&value) {
                continue;
            }
            if let Err(err) = self.backend.set(&storage_key(&field), value.to_string()) {
                warn!("Failed to persist option {field}: {err:#}");
            }
        }
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.options.freeze_planets = frozen;
    }

    /// Replay the entry choreography of every body.
    pub fn trigger_restart(&mut self) {
        self.restart_key = self.restart_key.wrapping_add(1);
    }

    /// Request the camera to return to the reference pose.
    pub fn trigger_reset(&mut self) {
        self.reset_key = self.reset_key.wrapping_add(1);
    }

    pub fn restart_key(&self) -> u32 {
        self.restart_key
    }

    pub fn reset_key(&self) -> u32 {
        self.reset_key
    }

    pub fn reference_pose(&self) -> CameraPose {
        CameraPose::load(
            self.backend.as_ref(),
            &REFERENCE_POSE_KEYS,
            CameraPose::default(),
        )
    }

    pub fn set_reference_pose(&mut self, pose: &CameraPose) {
        if let Err(err) = pose.save(self.backend.as_mut(), &REFERENCE_POSE_KEYS) {
            warn!("Failed to store reference camera pose: {err:#}");
        }
    }

    /// Last saved free-orbit pose; the reference pose when none was saved.
    pub fn live_pose(&self) -> CameraPose {
        CameraPose::load(self.backend.as_ref(), &LIVE_POSE_KEYS, self.reference_pose())
    }

    pub fn save_live_pose(&mut self, pose: &CameraPose) {
        if let Err(err) = pose.save(self.backend.as_mut(), &LIVE_POSE_KEYS) {
            warn!("Failed to store camera pose: {err:#}");
        }
    }
}

fn load_options(backend: &dyn KeyValueStore) -> ExploreOptions {
    let Ok(Value::Object(defaults)) = serde_json::to_value(ExploreOptions::default()) else {
        return ExploreOptions::default();
    };

    let mut merged: Map<String, Value> = defaults.clone();
    for field in defaults.keys() {
        let Some(raw) = backend.get(&storage_key(field)) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            warn!("Ignoring malformed stored option {field}: {raw}");
            continue;
        };

        let mut candidate = merged.clone();
        candidate.insert(field.clone(), value.clone());
        if serde_json::from_value::<ExploreOptions>(Value::Object(candidate)).is_ok() {
            merged.insert(field.clone(), value);
        } else {
            warn!("Ignoring invalid stored option {field}: {raw}");
        }
    }

    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}
