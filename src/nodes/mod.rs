//! Organization node list: fetch, defaults, and save-back.

use bevy::prelude::*;

use crate::core::ExploreSet;

pub mod fetcher;
pub mod systems;
pub mod types;

pub use systems::SubmitPatches;
pub use types::{NodeId, NodePatch, NodeStore, NodesConfig, NodesState, OrganizationNode, PendingPatches};

/// Plugin for node data management.
pub struct NodesPlugin;

impl Plugin for NodesPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(NodesConfig::from_env())
            .init_resource::<NodesState>()
            .init_resource::<NodeStore>()
            .init_resource::<PendingPatches>()
            .add_message::<SubmitPatches>()
            .add_systems(Startup, systems::setup_nodes_worker)
            .add_systems(
                Update,
                (
                    systems::request_nodes,
                    systems::submit_patches,
                    systems::apply_node_results,
                )
                    .chain()
                    .in_set(ExploreSet::Data),
            );
    }
}
