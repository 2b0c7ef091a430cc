//! Entry trajectories: curve families that carry a body from its spawn point onto its orbit.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::orbital::geometry::{Easing, OrbitCurve, apply_easing};

/// Chords shorter than this collapse to the end point.
const DEGENERATE_CHORD: f32 = 1e-5;
/// Entry speed never drops below this (units/s) so an entry always finishes.
pub const MIN_ENTRY_SPEED: f32 = 0.1;
/// Slot count used to spread fan arrivals vertically.
pub const FAN_SLOTS: usize = 8;

const ARC_BULGE: f32 = 0.4;
const SCURVE_BULGE: f32 = 0.45;
const ELLIPSE_LIFT: f32 = 0.5;
const WAVE_AMPLITUDE: f32 = 0.2;
const WAVE_CYCLES: f32 = 2.5;
const SPIRAL_RADIUS: f32 = 0.25;
const SPIRAL_TURNS: f32 = 1.5;
/// Fraction of the path over which the spiral radius grows in from zero.
const SPIRAL_RAMP_IN: f32 = 0.15;
const CORKSCREW_AMPLITUDE: f32 = 0.15;
const CORKSCREW_CYCLES: f32 = 3.0;
const FAN_VERTICAL_SPREAD: f32 = 4.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrajectoryKind {
    #[default]
    Linear,
    Arc,
    Ellipse,
    Scurve,
    Wave,
    Spiral,
    Corkscrew,
    Fan,
}

impl TrajectoryKind {
    pub const ALL: [TrajectoryKind; 8] = [
        TrajectoryKind::Linear,
        TrajectoryKind::Arc,
        TrajectoryKind::Ellipse,
        TrajectoryKind::Scurve,
        TrajectoryKind::Wave,
        TrajectoryKind::Spiral,
        TrajectoryKind::Corkscrew,
        TrajectoryKind::Fan,
    ];

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

/// Unit vector perpendicular to the chord in the horizontal plane.
///
/// A vertical chord has no horizontal perpendicular; X is used then.
fn chord_perpendicular(direction: Vec3) -> Vec3 {
    Vec3::Y.cross(direction).try_normalize().unwrap_or(Vec3::X)
}

/// Alternate handedness so neighbouring bodies curve opposite ways.
fn handedness(index: usize) -> f32 {
    if index % 2 == 0 { 1.0 } else { -1.0 }
}

/// Position along an entry trajectory at progress `t` (clamped to [0, 1]).
///
/// Every curve returns `end` exactly at `t = 1`, and starts at `start` at `t = 0`.
pub fn trajectory_position(
    t: f32,
    start: Vec3,
    end: Vec3,
    kind: TrajectoryKind,
    index: usize,
) -> Vec3 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 };
    if t >= 1.0 {
        return end;
    }

    let chord = end - start;
    let distance = chord.length();
    if !distance.is_finite() || distance < DEGENERATE_CHORD {
        return end;
    }
    let direction = chord / distance;
    let perp = chord_perpendicular(direction);
    let side = handedness(index);
    let base = start.lerp(end, t);
    let u = 1.0 - t;

    match kind {
        TrajectoryKind::Linear | TrajectoryKind::Fan => base,
        TrajectoryKind::Arc => {
            let control = start.lerp(end, 0.5) + perp * side * ARC_BULGE * distance;
            start * (u * u) + control * (2.0 * u * t) + end * (t * t)
        }
        TrajectoryKind::Scurve => {
            let offset = perp * side * SCURVE_BULGE * distance;
            let c1 = start.lerp(end, 1.0 / 3.0) + offset;
            let c2 = start.lerp(end, 2.0 / 3.0) - offset;
            start * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + end * (t * t * t)
        }
        TrajectoryKind::Ellipse => base + Vec3::Y * ((PI * u).sin() * ELLIPSE_LIFT * distance),
        TrajectoryKind::Wave => {
            let lateral = WAVE_AMPLITUDE * distance * u * (TAU * WAVE_CYCLES * t).sin();
            base + perp * side * lateral
        }
        TrajectoryKind::Spiral => {
            let ramp = (t / SPIRAL_RAMP_IN).min(1.0);
            let ramp = ramp * ramp * (3.0 - 2.0 * ramp);
            let radius = SPIRAL_RADIUS * distance * u * ramp;
            let angle = side * TAU * SPIRAL_TURNS * u;
            base + (perp * angle.cos() + Vec3::Y * angle.sin()) * radius
        }
        TrajectoryKind::Corkscrew => {
            let amplitude = CORKSCREW_AMPLITUDE * distance * u;
            let angle = TAU * CORKSCREW_CYCLES * t;
            base + (perp * side * angle.sin() + Vec3::Y * (1.0 - angle.cos())) * amplitude
        }
    }
}

/// Spawn point for a fan entry: behind the hand-off point along the orbit tangent,
/// spread vertically by slot.
///
/// The slot fraction divides by a fixed [`FAN_SLOTS`] rather than the body count, so
/// indices past 8 keep climbing.
pub fn fan_start(curve: &OrbitCurve, end_phase: f32, fan_distance: f32, index: usize) -> Vec3 {
    let end = curve.position(end_phase);
    let tangent = curve.tangent(end_phase);
    let slot = index as f32 / FAN_SLOTS.max(1) as f32;
    let lift = (slot - 0.5) * FAN_VERTICAL_SPREAD;
    end - tangent * fan_distance + Vec3::Y * lift
}

/// Polyline length of a trajectory, sampled at `segments` points.
pub fn path_length(
    start: Vec3,
    end: Vec3,
    kind: TrajectoryKind,
    index: usize,
    segments: usize,
) -> f32 {
    let segments = segments.max(1);
    let mut length = 0.0;
    let mut previous = start;
    for i in 1..=segments {
        let point = trajectory_position(i as f32 / segments as f32, start, end, kind, index);
        length += previous.distance(point);
        previous = point;
    }
    length
}

/// How entry progress advances
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntryTiming {
    /// Seconds; zero or negative integrates speed instead.
    pub duration: f32,
    pub speed_start: f32,
    pub speed_end: f32,
    pub easing: Easing,
}

impl EntryTiming {
    /// Apply a per-node constant entry speed override.
    pub fn with_speed_override(mut self, speed: Option<f32>) -> Self {
        if let Some(speed) = speed.filter(|s| s.is_finite() && *s > 0.0) {
            self.speed_start = speed;
            self.speed_end = speed;
        }
        self
    }

    pub fn speed_at(&self, t: f32) -> f32 {
        let k = apply_easing(t, self.easing);
        (self.speed_start + (self.speed_end - self.speed_start) * k).max(MIN_ENTRY_SPEED)
    }
}

/// Progress accumulator of one entry animation
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EntryProgress {
    pub elapsed: f32,
    /// Raw progress in [0, 1]
    pub t: f32,
}

impl EntryProgress {
    /// Advance by `dt` seconds along a path of `distance` units.
    pub fn advance(&mut self, dt: f32, timing: &EntryTiming, distance: f32) {
        let dt = dt.max(0.0);
        self.elapsed += dt;

        if timing.duration > 0.0 {
            self.t = (self.elapsed / timing.duration).min(1.0);
            return;
        }
        if !distance.is_finite() || distance <= DEGENERATE_CHORD {
            self.t = 1.0;
            return;
        }
        let speed = timing.speed_at(self.t);
        self.t = (self.t + speed * dt / distance).min(1.0);
    }

    /// Curve parameter. Duration mode eases the parameter; speed mode eases the speed.
    pub fn curve_t(&self, timing: &EntryTiming) -> f32 {
        if timing.duration > 0.0 {
            apply_easing(self.t, timing.easing)
        } else {
            self.t
        }
    }

    pub fn is_complete(&self) -> bool {
        self.t >= 1.0
    }
}
