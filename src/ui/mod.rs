//! User interface module
//!
//! Keyboard shortcuts plus a text overlay for the selected node. The overlay only
//! listens to selection messages; it never drives the scene.

use bevy::prelude::*;

use crate::core::ExploreSet;

pub mod overlay;
pub mod shortcuts;

pub use overlay::OverlayState;

/// Plugin for user interface management
pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OverlayState>()
            .add_systems(Startup, overlay::spawn_overlay)
            .add_systems(Update, shortcuts::keyboard_shortcuts.in_set(ExploreSet::Input))
            .add_systems(
                Update,
                (overlay::track_overlay_messages, overlay::render_overlay)
                    .chain()
                    .in_set(ExploreSet::Presentation),
            );
    }
}
