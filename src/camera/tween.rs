//! Time-based camera interpolation

use bevy::prelude::*;

use crate::camera::pose::CameraPose;
use crate::orbital::geometry::{Easing, apply_easing};

/// Length of every selection and reset flight.
pub const CAMERA_TWEEN_SECS: f32 = 1.5;
pub const CAMERA_TWEEN_EASING: Easing = Easing::EaseInOut;

/// One vector moving from `from` to `to` over `duration` seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3Tween {
    pub from: Vec3,
    pub to: Vec3,
    pub duration: f32,
    pub elapsed: f32,
    pub easing: Easing,
}

impl Vec3Tween {
    pub fn new(from: Vec3, to: Vec3, duration: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
            easing,
        }
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn value(&self) -> Vec3 {
        let t = self.progress();
        if t >= 1.0 {
            return self.to;
        }
        self.from.lerp(self.to, apply_easing(t, self.easing))
    }

    pub fn advance(&mut self, dt: f32) -> Vec3 {
        if dt.is_finite() {
            self.elapsed += dt.max(0.0);
        }
        self.value()
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

/// Eye and target tweens, advanced together but interpolated independently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraTween {
    pub position: Vec3Tween,
    pub target: Vec3Tween,
}

impl CameraTween {
    pub fn new(from: CameraPose, to: CameraPose, duration: f32, easing: Easing) -> Self {
        Self {
            position: Vec3Tween::new(from.position, to.position, duration, easing),
            target: Vec3Tween::new(from.target, to.target, duration, easing),
        }
    }

    pub fn advance(&mut self, dt: f32) -> CameraPose {
        CameraPose {
            position: self.position.advance(dt),
            target: self.target.advance(dt),
        }
    }

    pub fn destination(&self) -> CameraPose {
        CameraPose {
            position: self.position.to,
            target: self.target.to,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.position.is_finished() && self.target.is_finished()
    }
}
