use bevy::picking::prelude::*;
use bevy::prelude::*;
use bevy::window::{PresentMode, Window, WindowPlugin};

use bevy_panorbit_camera::PanOrbitCameraPlugin;

#[cfg(feature = "dev")]
use bevy::dev_tools::fps_overlay::FpsOverlayPlugin;

mod camera;
mod core;
mod nodes;
mod options;
mod orbital;
mod scene;
mod ui;

// Import plugins
use camera::CameraControlPlugin;
use core::CorePlugin;
use nodes::NodesPlugin;
use options::OptionsStore;
use options::store::open_default_store;
use orbital::OrbitalPlugin;
use scene::ScenePlugin;
use ui::UiPlugin;

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Explore Orbits".to_string(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    }));

    #[cfg(feature = "dev")]
    app.add_plugins(FpsOverlayPlugin::default());

    app.insert_resource(OptionsStore::load(open_default_store()));

    app.add_plugins(PanOrbitCameraPlugin);
    app.add_plugins(MeshPickingPlugin);

    // Add our custom plugins
    app.add_plugins(CorePlugin);
    app.add_plugins(NodesPlugin);
    app.add_plugins(OrbitalPlugin);
    app.add_plugins(CameraControlPlugin);
    app.add_plugins(ScenePlugin);
    app.add_plugins(UiPlugin);

    app.run();
}
