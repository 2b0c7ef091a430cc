//! Hover-driven time dilation
//!
//! One scalar slows every orbit and the sun's spin while the pointer rests over the
//! system. It eases toward its target every frame and never snaps.

use bevy::prelude::*;

use crate::options::ExploreOptions;

const SETTLED_EPSILON: f32 = 1e-3;

/// What the pointer is over this frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HoverKind {
    #[default]
    None,
    /// Inside the orbital disk but not on a body
    Orbit,
    Planet,
}

/// Whether a ray passes through the disk holding every orbit.
///
/// The closest point of the ray to the origin must lie within `max_radius + margin`
/// horizontally-and-radially and within `envelope + margin` of the orbital plane.
pub fn ray_hits_orbital_disk(
    origin: Vec3,
    direction: Vec3,
    max_radius: f32,
    envelope: f32,
    margin: f32,
) -> bool {
    let Some(direction) = direction.try_normalize() else {
        return false;
    };
    if !origin.is_finite() {
        return false;
    }
    let along = (-origin).dot(direction).max(0.0);
    let closest = origin + direction * along;
    closest.length() <= max_radius + margin && closest.y.abs() <= envelope + margin
}

/// Smoothed global speed multiplier
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct HoverDilation {
    pub current: f32,
    pub target: f32,
    last_kind: HoverKind,
}

impl Default for HoverDilation {
    fn default() -> Self {
        Self {
            current: 1.0,
            target: 1.0,
            last_kind: HoverKind::None,
        }
    }
}

impl HoverDilation {
    pub fn factor(&self) -> f32 {
        self.current
    }

    pub fn target_for(kind: HoverKind, options: &ExploreOptions) -> f32 {
        let ratio = match kind {
            HoverKind::Planet => options.hover_planet_speed_ratio,
            HoverKind::Orbit => options.hover_orbit_speed_ratio,
            HoverKind::None => 1.0,
        };
        if ratio.is_finite() { ratio.max(0.0) } else { 1.0 }
    }

    /// Ease toward the target for `kind`. Entering a planet hover, and leaving one
    /// until the factor has settled, uses the planet transition speed; everything
    /// else uses the orbit one.
    pub fn update(&mut self, kind: HoverKind, dt: f32, options: &ExploreOptions) {
        self.target = Self::target_for(kind, options);
        let leaving_planet = kind != HoverKind::Planet && self.last_kind == HoverKind::Planet;
        let speed = if kind == HoverKind::Planet || leaving_planet {
            options.hover_planet_transition_speed
        } else {
            options.hover_orbit_transition_speed
        };

        let step = (dt.max(0.0) * speed.max(0.0)).min(1.0);
        let next = self.current + (self.target - self.current) * step;
        self.current = if next.is_finite() { next } else { self.target };

        if !leaving_planet || (self.target - self.current).abs() < SETTLED_EPSILON {
            self.last_kind = kind;
        }
    }
}
