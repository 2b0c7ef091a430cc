//! Single owner of camera motion
//!
//! Free orbiting is observed into the director every frame; selection and reset
//! flights go through [`CameraHandle`]. The director holds at most one flight, so a
//! new request always replaces the previous one instead of stacking on top of it.

use bevy::prelude::*;

use crate::camera::pose::CameraPose;
use crate::camera::tween::CameraTween;
use crate::orbital::geometry::Easing;

/// What the selection controller may do with the camera.
pub trait CameraHandle {
    fn pose(&self) -> CameraPose;
    fn tween_to(&mut self, pose: CameraPose, duration: f32, easing: Easing);
    fn cancel_tween(&mut self);
    fn is_tweening(&self) -> bool;
}

#[derive(Resource, Debug, Default)]
pub struct CameraDirector {
    pose: CameraPose,
    tween: Option<CameraTween>,
    flights: u32,
}

impl CameraDirector {
    pub fn new(pose: CameraPose) -> Self {
        Self {
            pose,
            ..default()
        }
    }

    /// Record the pose the free camera is currently at. Ignored during a flight.
    pub fn observe(&mut self, pose: CameraPose) {
        if self.tween.is_none() && pose.is_finite() {
            self.pose = pose;
        }
    }

    /// Step the active flight; returns the pose to apply this frame.
    pub fn advance(&mut self, dt: f32) -> Option<CameraPose> {
        let tween = self.tween.as_mut()?;
        let pose = tween.advance(dt);
        if tween.is_finished() {
            self.tween = None;
        }
        if pose.is_finite() {
            self.pose = pose;
        }
        Some(self.pose)
    }

    /// Number of flights started so far.
    pub fn flights(&self) -> u32 {
        self.flights
    }

    pub fn destination(&self) -> Option<CameraPose> {
        self.tween.as_ref().map(CameraTween::destination)
    }
}

impl CameraHandle for CameraDirector {
    fn pose(&self) -> CameraPose {
        self.pose
    }

    fn tween_to(&mut self, pose: CameraPose, duration: f32, easing: Easing) {
        if !pose.is_finite() {
            warn!("Ignoring camera flight to a non-finite pose");
            return;
        }
        self.tween = Some(CameraTween::new(self.pose, pose, duration, easing));
        self.flights += 1;
    }

    fn cancel_tween(&mut self) {
        self.tween = None;
    }

    fn is_tweening(&self) -> bool {
        self.tween.is_some()
    }
}
