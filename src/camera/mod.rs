//! Selection and camera control
//!
//! `selection` owns which node is selected, `director` owns camera flights, and
//! `systems` wires both to picking input and `bevy_panorbit_camera`.

use bevy::prelude::*;

use crate::core::ExploreSet;

pub mod director;
pub mod pose;
pub mod selection;
pub mod systems;
pub mod tween;

pub use director::{CameraDirector, CameraHandle};
pub use pose::CameraPose;
pub use selection::{NodeOpened, NodeSelected, SelectionCleared, SelectionState};

/// Marker for the orbit camera
#[derive(Component)]
pub struct MainCamera;

pub struct CameraControlPlugin;

impl Plugin for CameraControlPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SelectionState>()
            .init_resource::<CameraDirector>()
            .init_resource::<systems::PoseSaveThrottle>()
            .add_message::<NodeSelected>()
            .add_message::<NodeOpened>()
            .add_message::<SelectionCleared>()
            .add_systems(Startup, systems::spawn_camera)
            .add_systems(
                Update,
                (
                    systems::drop_vanished_selection,
                    systems::handle_clicks,
                    systems::handle_reset_requests,
                    systems::drive_camera,
                    systems::persist_camera_pose,
                    systems::update_fov,
                )
                    .chain()
                    .in_set(ExploreSet::Camera),
            );
    }
}
