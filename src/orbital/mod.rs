//! Orbital simulation
//!
//! Geometry, entry trajectories, and the per-body state machine are plain Rust and
//! never touch the ECS. `systems` is the thin adapter that runs them once per frame.

use bevy::prelude::*;

use crate::core::ExploreSet;

pub mod body;
pub mod components;
pub mod dilation;
pub mod geometry;
pub mod layout;
pub mod positions;
pub mod systems;
pub mod trajectory;

pub use components::{ExploreNode, OrbitBody, SunBody};
pub use dilation::HoverDilation;
pub use positions::LivePositions;

/// Plugin for body simulation and hover dilation
pub struct OrbitalPlugin;

impl Plugin for OrbitalPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LivePositions>()
            .init_resource::<HoverDilation>()
            .add_systems(
                Update,
                (
                    systems::update_hover_dilation,
                    systems::tick_bodies,
                    systems::spin_sun,
                )
                    .chain()
                    .in_set(ExploreSet::Simulation),
            );
    }
}
