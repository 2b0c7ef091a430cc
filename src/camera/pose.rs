//! Camera pose and its flat-key persistence

use bevy::prelude::*;

use crate::options::store::KeyValueStore;

/// Default framing of the whole system.
pub const DEFAULT_CAMERA_POSITION: Vec3 = Vec3::new(0.0, 6.84, 18.79);

/// Eye position plus look-at target
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: DEFAULT_CAMERA_POSITION,
            target: Vec3::ZERO,
        }
    }
}

/// Storage key set for one persisted pose
#[derive(Clone, Copy, Debug)]
pub struct PoseKeys {
    pub position: [&'static str; 3],
    pub target: [&'static str; 3],
}

/// Reference pose, restored on reset.
pub const REFERENCE_POSE_KEYS: PoseKeys = PoseKeys {
    position: ["camera_ref_x", "camera_ref_y", "camera_ref_z"],
    target: [
        "camera_ref_target_x",
        "camera_ref_target_y",
        "camera_ref_target_z",
    ],
};

/// Last free-orbit pose, restored at start-up.
pub const LIVE_POSE_KEYS: PoseKeys = PoseKeys {
    position: ["explore_camera_x", "explore_camera_y", "explore_camera_z"],
    target: [
        "explore_camera_target_x",
        "explore_camera_target_y",
        "explore_camera_target_z",
    ],
};

impl CameraPose {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }

    /// Read a pose; every missing or malformed component falls back to `fallback`.
    pub fn load(store: &dyn KeyValueStore, keys: &PoseKeys, fallback: CameraPose) -> Self {
        let read = |key: &str, default: f32| -> f32 {
            store
                .get(key)
                .and_then(|raw| raw.trim().trim_matches('"').parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default)
        };
        let position = Vec3::new(
            read(keys.position[0], fallback.position.x),
            read(keys.position[1], fallback.position.y),
            read(keys.position[2], fallback.position.z),
        );
        let target = Vec3::new(
            read(keys.target[0], fallback.target.x),
            read(keys.target[1], fallback.target.y),
            read(keys.target[2], fallback.target.z),
        );
        Self { position, target }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore, keys: &PoseKeys) -> anyhow::Result<()> {
        let values = [
            (keys.position[0], self.position.x),
            (keys.position[1], self.position.y),
            (keys.position[2], self.position.z),
            (keys.target[0], self.target.x),
            (keys.target[1], self.target.y),
            (keys.target[2], self.target.z),
        ];
        for (key, value) in values {
            store.set(key, value.to_string())?;
        }
        Ok(())
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.target.is_finite()
    }

    /// Component-wise interpolation of eye and target.
    pub fn lerp(&self, other: &CameraPose, t: f32) -> CameraPose {
        CameraPose {
            position: self.position.lerp(other.position, t),
            target: self.target.lerp(other.target, t),
        }
    }

    pub fn approx_eq(&self, other: &CameraPose, epsilon: f32) -> bool {
        self.position.distance(other.position) <= epsilon
            && self.target.distance(other.target) <= epsilon
    }
}

/// Orbit-camera parameters equivalent to a pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitAngles {
    pub focus: Vec3,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl From<&CameraPose> for OrbitAngles {
    fn from(pose: &CameraPose) -> Self {
        let offset = pose.position - pose.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return OrbitAngles {
                focus: pose.target,
                radius: 0.0,
                yaw: 0.0,
                pitch: 0.0,
            };
        }
        OrbitAngles {
            focus: pose.target,
            radius,
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / radius).clamp(-1.0, 1.0).asin(),
        }
    }
}

impl OrbitAngles {
    pub fn to_pose(&self) -> CameraPose {
        let offset = Vec3::new(
            self.radius * self.pitch.cos() * self.yaw.sin(),
            self.radius * self.pitch.sin(),
            self.radius * self.pitch.cos() * self.yaw.cos(),
        );
        CameraPose {
            position: self.focus + offset,
            target: self.focus,
        }
    }
}
