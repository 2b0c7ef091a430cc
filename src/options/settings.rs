//! Tunable parameters of the explore scene

use serde::{Deserialize, Serialize};

use crate::orbital::geometry::{Easing, OrbitShape};
use crate::orbital::layout::VerticalMode;
use crate::orbital::trajectory::TrajectoryKind;

/// Every knob the scene reads. Field names double as storage keys (`planets_<camelCase>`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExploreOptions {
    pub show_orbits: bool,
    /// Runtime only; a reload never starts frozen.
    #[serde(skip)]
    pub freeze_planets: bool,
    pub show_debug_info: bool,
    /// Vertical field of view in degrees
    pub fish_eye: f32,
    pub orbit_spacing: f32,
    pub global_shape_override: bool,
    pub orbit_shape: OrbitShape,
    pub orbit_roundness: f32,
    pub planet_scale: f32,

    // Pointer and collision perturbation
    pub mouse_force: f32,
    pub collision_force: f32,
    pub damping: f32,

    // Entry choreography
    pub entry_start_x: f32,
    pub entry_start_y: f32,
    /// `None` starts each body at its own orbit radius on z.
    pub entry_start_z: Option<f32>,
    pub entry_trajectory: TrajectoryKind,
    pub entry_speed_start: f32,
    pub entry_speed_end: f32,
    pub entry_easing: Easing,
    /// Seconds; 0 integrates speed instead.
    pub entry_duration: f32,
    pub fan_distance: f32,

    // Orbit speed ramp (linear units per second)
    pub orbit_speed_start: f32,
    pub orbit_speed_target: Option<f32>,
    pub orbital_ramp_duration: f32,
    pub orbit_easing: Easing,
    pub show_entry_trajectory: bool,

    // Hover time dilation
    pub hover_orbit_speed_ratio: f32,
    pub hover_planet_speed_ratio: f32,
    pub hover_orbit_transition_speed: f32,
    pub hover_planet_transition_speed: f32,
    pub hover_disk_margin: f32,

    pub vertical_mode: VerticalMode,
    pub vertical_amplitude: f32,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            show_orbits: true,
            freeze_planets: false,
            show_debug_info: false,
            fish_eye: 50.0,
            orbit_spacing: 1.0,
            global_shape_override: false,
            orbit_shape: OrbitShape::Circle,
            orbit_roundness: 0.6,
            planet_scale: 1.0,
            mouse_force: 0.5,
            collision_force: 0.3,
            damping: 0.92,
            entry_start_x: -60.0,
            entry_start_y: 0.0,
            entry_start_z: None,
            entry_trajectory: TrajectoryKind::Linear,
            entry_speed_start: 30.0,
            entry_speed_end: 30.0,
            entry_easing: Easing::Linear,
            entry_duration: 0.0,
            fan_distance: 25.0,
            orbit_speed_start: 0.0,
            orbit_speed_target: None,
            orbital_ramp_duration: 0.0,
            orbit_easing: Easing::EaseOut,
            show_entry_trajectory: false,
            hover_orbit_speed_ratio: 0.35,
            hover_planet_speed_ratio: 0.05,
            hover_orbit_transition_speed: 2.0,
            hover_planet_transition_speed: 5.0,
            hover_disk_margin: 2.0,
            vertical_mode: VerticalMode::Manual,
            vertical_amplitude: 1.5,
        }
    }
}

impl ExploreOptions {
    /// Damping clamped into (0, 1) so perturbation always decays.
    pub fn effective_damping(&self) -> f32 {
        if self.damping.is_finite() {
            self.damping.clamp(0.0, 0.999)
        } else {
            0.92
        }
    }

    pub fn effective_spacing(&self) -> f32 {
        if self.orbit_spacing.is_finite() && self.orbit_spacing > 0.0 {
            self.orbit_spacing
        } else {
            1.0
        }
    }
}
