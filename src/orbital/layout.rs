//! Deterministic orbit assignment for each body
//!
//! A body's nominal orbit depends only on its node data, its index among the orbiting
//! bodies, the body count and the options. Nothing here reads the clock or any state.

use serde::{Deserialize, Serialize};

use crate::nodes::types::OrganizationNode;
use crate::options::ExploreOptions;
use crate::orbital::geometry::{MAX_SQUIRCLE_ROUNDNESS, OrbitCurve};

pub const BASE_ORBIT_RADIUS: f32 = 3.0;
pub const ORBIT_RADIUS_STEP: f32 = 1.5;
pub const ORBIT_PHASE_STEP: f32 = 0.7;

/// How bodies are spread above and below the orbital plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalMode {
    /// Per-node `orbit_position_y`
    #[default]
    Manual,
    /// Evenly spaced from `-amplitude` to `+amplitude` by index
    Homogeneous,
    /// Alternating above/below, growing outwards by index pair
    Jupiter,
}

/// Vertical offset of body `index` among `count` bodies.
pub fn vertical_offset(
    mode: VerticalMode,
    index: usize,
    count: usize,
    amplitude: f32,
    manual: Option<f32>,
) -> f32 {
    let amplitude = if amplitude.is_finite() {
        amplitude.abs()
    } else {
        0.0
    };
    match mode {
        VerticalMode::Manual => manual.filter(|y| y.is_finite()).unwrap_or(0.0),
        VerticalMode::Homogeneous => {
            if count <= 1 {
                0.0
            } else {
                -amplitude + 2.0 * amplitude * index as f32 / (count - 1) as f32
            }
        }
        VerticalMode::Jupiter => {
            if count <= 1 {
                return 0.0;
            }
            let pairs = count.div_ceil(2) as f32;
            let magnitude = amplitude * (index / 2 + 1) as f32 / pairs;
            if index % 2 == 0 { magnitude } else { -magnitude }
        }
    }
}

/// Upper bound of `|vertical_offset|` over every body for the given options.
pub fn vertical_envelope(options: &ExploreOptions, nodes: &[&OrganizationNode]) -> f32 {
    match options.vertical_mode {
        VerticalMode::Manual => nodes
            .iter()
            .filter_map(|n| n.orbit_position_y)
            .filter(|y| y.is_finite())
            .fold(0.0, |acc: f32, y| acc.max(y.abs())),
        VerticalMode::Homogeneous | VerticalMode::Jupiter => {
            if options.vertical_amplitude.is_finite() {
                options.vertical_amplitude.abs()
            } else {
                0.0
            }
        }
    }
}

/// Nominal orbit of one body
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitSlot {
    pub curve: OrbitCurve,
    /// Phase at entry hand-off when no nearest-phase search applies.
    pub initial_phase: f32,
    /// Angular speed in rad/s
    pub angular_speed: f32,
}

impl OrbitSlot {
    /// Orbit of the `index`-th of `count` orbiting nodes.
    pub fn for_node(
        node: &OrganizationNode,
        index: usize,
        count: usize,
        options: &ExploreOptions,
    ) -> Self {
        let spacing = options.effective_spacing();
        let base_radius = node
            .orbit_radius
            .filter(|r| r.is_finite())
            .unwrap_or(BASE_ORBIT_RADIUS + index as f32 * ORBIT_RADIUS_STEP);
        let radius = (base_radius * spacing).max(0.0);

        let (shape, roundness) = if options.global_shape_override {
            (options.orbit_shape, options.orbit_roundness)
        } else {
            (node.orbit_shape, node.orbit_roundness)
        };

        let vertical = vertical_offset(
            options.vertical_mode,
            index,
            count,
            options.vertical_amplitude,
            node.orbit_position_y,
        );

        let initial_phase = node
            .orbit_phase
            .filter(|p| p.is_finite())
            .unwrap_or(index as f32 * ORBIT_PHASE_STEP);

        Self {
            curve: OrbitCurve {
                radius,
                shape,
                roundness: roundness.clamp(0.0, MAX_SQUIRCLE_ROUNDNESS),
                vertical_offset: vertical,
            },
            initial_phase,
            angular_speed: node.orbit_speed,
        }
    }
}
