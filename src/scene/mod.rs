//! Scene composition
//!
//! Turns the node list into entities (one sun, one body per orbiting node), owns the
//! lighting rig and the pointer probe, and draws everything derived from the
//! simulation: rings, entry paths, highlights and animated details.

use bevy::prelude::*;

use crate::core::ExploreSet;

pub mod lighting;
pub mod pointer;
pub mod rings;
pub mod spawn;
pub mod visual;

pub use pointer::PointerProbe;

/// Plugin for scene entities, pointer tracking and gizmos
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerProbe>()
            .add_systems(Startup, lighting::spawn_lighting)
            .add_systems(Update, spawn::sync_scene.in_set(ExploreSet::Scene))
            .add_systems(
                Update,
                (pointer::update_pointer_ray, pointer::track_hovered_node)
                    .chain()
                    .in_set(ExploreSet::Input),
            )
            .add_systems(
                Update,
                (
                    pointer::apply_highlight,
                    rings::draw_orbit_rings,
                    rings::draw_entry_paths,
                    visual::animate_sparks,
                    visual::resolve_pending_models,
                )
                    .in_set(ExploreSet::Presentation),
            );
    }
}
