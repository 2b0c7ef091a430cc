//! Keyboard shortcuts

use bevy::prelude::*;

use crate::camera::director::{CameraDirector, CameraHandle};
use crate::camera::selection::{NodeOpened, SelectionState};
use crate::nodes::SubmitPatches;
use crate::nodes::types::{NodePatch, NodeStore, PendingPatches};
use crate::options::OptionsStore;
use crate::orbital::components::{ExploreNode, OrbitBody};
use crate::orbital::layout::{BASE_ORBIT_RADIUS, ORBIT_RADIUS_STEP};

const RADIUS_NUDGE: f32 = 0.5;
const MIN_EDIT_RADIUS: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    ReplayIntro,
    ToggleOrbits,
    ToggleFreeze,
    ResetView,
    OpenSelected,
    SaveReferencePose,
    ShrinkOrbit,
    GrowOrbit,
    SavePatches,
    NextTrajectory,
}

impl Shortcut {
    pub fn for_key(key: KeyCode) -> Option<Self> {
        let shortcut = match key {
            KeyCode::KeyR => Shortcut::ReplayIntro,
            KeyCode::KeyO => Shortcut::ToggleOrbits,
            KeyCode::KeyF => Shortcut::ToggleFreeze,
            KeyCode::Escape => Shortcut::ResetView,
            KeyCode::Enter => Shortcut::OpenSelected,
            KeyCode::KeyC => Shortcut::SaveReferencePose,
            KeyCode::BracketLeft => Shortcut::ShrinkOrbit,
            KeyCode::BracketRight => Shortcut::GrowOrbit,
            KeyCode::KeyS => Shortcut::SavePatches,
            KeyCode::KeyT => Shortcut::NextTrajectory,
            _ => return None,
        };
        Some(shortcut)
    }
}

/// Orbit radius after one nudge, never below [`MIN_EDIT_RADIUS`].
pub fn nudged_radius(current: f32, grow: bool) -> f32 {
    let delta = if grow { RADIUS_NUDGE } else { -RADIUS_NUDGE };
    (current + delta).max(MIN_EDIT_RADIUS)
}

#[allow(clippy::too_many_arguments)]
pub fn keyboard_shortcuts(
    keys: Res<ButtonInput<KeyCode>>,
    mut store: ResMut<OptionsStore>,
    selection: Res<SelectionState>,
    director: Res<CameraDirector>,
    mut nodes: ResMut<NodeStore>,
    mut pending: ResMut<PendingPatches>,
    bodies: Query<(&ExploreNode, &OrbitBody)>,
    mut opened: MessageWriter<NodeOpened>,
    mut submit: MessageWriter<SubmitPatches>,
) {
    for shortcut in keys.get_just_pressed().filter_map(|k| Shortcut::for_key(*k)) {
        match shortcut {
            Shortcut::ReplayIntro => {
                info!("[UI] replaying intro");
                store.trigger_restart();
            }
            Shortcut::ToggleOrbits => store.update(|o| o.show_orbits = !o.show_orbits),
            Shortcut::ToggleFreeze => {
                let frozen = !store.options().freeze_planets;
                store.set_frozen(frozen);
            }
            Shortcut::ResetView => store.trigger_reset(),
            Shortcut::OpenSelected => {
                if let Some(id) = selection.selected() {
                    opened.write(NodeOpened { id: id.clone() });
                }
            }
            Shortcut::SaveReferencePose => {
                let pose = director.pose();
                store.set_reference_pose(&pose);
                info!("[UI] reference pose saved at {:?}", pose.position);
            }
            Shortcut::ShrinkOrbit | Shortcut::GrowOrbit => {
                let Some(id) = selection.selected().cloned() else {
                    continue;
                };
                let Some(node) = nodes.get(&id) else { continue };
                let index = bodies
                    .iter()
                    .find(|(explore, _)| explore.id == id)
                    .map(|(_, body)| body.params.index);
                let Some(index) = index else { continue };

                let current = node
                    .orbit_radius
                    .unwrap_or(BASE_ORBIT_RADIUS + index as f32 * ORBIT_RADIUS_STEP);
                let patch = NodePatch {
                    orbit_radius: Some(nudged_radius(current, shortcut == Shortcut::GrowOrbit)),
                    ..default()
                };
                nodes.apply_patch(&id, &patch);
                pending.stage(&id, patch);
            }
            Shortcut::SavePatches => {
                submit.write(SubmitPatches);
            }
            Shortcut::NextTrajectory => {
                store.update(|o| o.entry_trajectory = o.entry_trajectory.next());
                info!("[UI] entry trajectory {:?}", store.options().entry_trajectory);
                store.trigger_restart();
            }
        }
    }
}
