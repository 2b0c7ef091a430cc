//! Camera systems: spawn, clicks, flights, and pose persistence.

use bevy::picking::events::{Click, Pointer};
use bevy::picking::pointer::PointerButton;
use bevy::prelude::*;
use bevy_panorbit_camera::PanOrbitCamera;

use crate::camera::MainCamera;
use crate::camera::director::{CameraDirector, CameraHandle};
use crate::camera::pose::{CameraPose, OrbitAngles};
use crate::camera::selection::{
    ClickTarget, NodeOpened, NodeSelected, SelectionCleared, SelectionEvent, SelectionState,
    handle_click, reset_view,
};
use crate::nodes::types::{NodeStore, partition_nodes};
use crate::options::OptionsStore;
use crate::orbital::components::{ExploreNode, OrbitBody};
use crate::orbital::positions::LivePositions;

const MIN_ZOOM: f32 = 5.0;
const MAX_ZOOM: f32 = 60.0;
/// Lowest elevation the free camera may reach (polar angle limit of 2π/3).
const MIN_PITCH: f32 = -std::f32::consts::FRAC_PI_6;
const POSE_SAVE_INTERVAL_SECS: f32 = 0.5;
const POSE_SAVE_EPSILON: f32 = 1e-3;
/// Presses held longer than this are orbit drags, not clicks on empty space.
const MAX_EMPTY_CLICK_SECS: f32 = 0.3;

/// Decides when the free-orbit pose is worth writing to storage.
#[derive(Resource, Debug, Default)]
pub struct PoseSaveThrottle {
    since_check: f32,
    last_saved: Option<CameraPose>,
}

impl PoseSaveThrottle {
    pub fn new(saved: CameraPose) -> Self {
        Self {
            since_check: 0.0,
            last_saved: Some(saved),
        }
    }

    /// Returns the pose to persist, at most once per interval and never mid-flight.
    pub fn poll(&mut self, dt: f32, pose: CameraPose, tweening: bool) -> Option<CameraPose> {
        self.since_check += dt.max(0.0);
        if self.since_check < POSE_SAVE_INTERVAL_SECS {
            return None;
        }
        self.since_check = 0.0;
        if tweening || !pose.is_finite() {
            return None;
        }
        if self
            .last_saved
            .is_some_and(|saved| saved.approx_eq(&pose, POSE_SAVE_EPSILON))
        {
            return None;
        }
        self.last_saved = Some(pose);
        Some(pose)
    }
}

pub fn spawn_camera(mut commands: Commands, store: Res<OptionsStore>) {
    let pose = store.live_pose();
    let angles = OrbitAngles::from(&pose);
    let fov = store.options().fish_eye.to_radians();

    let pan_orbit = PanOrbitCamera {
        focus: angles.focus,
        target_focus: angles.focus,
        radius: Some(angles.radius),
        target_radius: angles.radius,
        yaw: Some(angles.yaw),
        target_yaw: angles.yaw,
        pitch: Some(angles.pitch),
        target_pitch: angles.pitch,
        zoom_lower_limit: MIN_ZOOM,
        zoom_upper_limit: Some(MAX_ZOOM),
        pitch_lower_limit: Some(MIN_PITCH),
        force_update: true,
        ..default()
    };

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov,
            near: 0.1,
            far: 1_000.0,
            ..default()
        }),
        Camera {
            clear_color: ClearColorConfig::Custom(Color::BLACK),
            ..default()
        },
        pan_orbit,
        MainCamera,
        Transform::from_translation(pose.position).looking_at(pose.target, Vec3::Y),
    ));

    commands.insert_resource(CameraDirector::new(pose));
    commands.insert_resource(PoseSaveThrottle::new(pose));
    info!("[CAMERA] restored pose {:?}", pose.position);
}

pub fn handle_clicks(
    mut clicks: MessageReader<Pointer<Click>>,
    nodes: Query<(&ExploreNode, Option<&OrbitBody>)>,
    parents: Query<&ChildOf>,
    windows: Query<(), With<Window>>,
    positions: Res<LivePositions>,
    mut selection: ResMut<SelectionState>,
    mut director: ResMut<CameraDirector>,
    mut store: ResMut<OptionsStore>,
    mut selected_writer: MessageWriter<NodeSelected>,
    mut opened_writer: MessageWriter<NodeOpened>,
    mut cleared_writer: MessageWriter<SelectionCleared>,
) {
    for ev in clicks.read() {
        if ev.button != PointerButton::Primary {
            continue;
        }

        let target = if windows.contains(ev.entity) {
            if ev.duration.as_secs_f32() > MAX_EMPTY_CLICK_SECS {
                continue;
            }
            ClickTarget::Empty
        } else {
            let mut entity = ev.entity;
            let hit = loop {
                if let Ok(hit) = nodes.get(entity) {
                    break Some(hit);
                }
                if let Ok(parent) = parents.get(entity) {
                    entity = parent.parent();
                    continue;
                }
                break None;
            };
            let Some((node, body)) = hit else { continue };

            let focus = positions
                .latest(&node.id)
                .or_else(|| body.map(|b| b.params.resting_position()))
                .unwrap_or(Vec3::ZERO);
            ClickTarget::Body {
                id: node.id.clone(),
                focus,
                scale: node.base_scale,
            }
        };

        let reference = store.reference_pose();
        let Some(event) = handle_click(&mut selection, target, director.as_mut(), reference)
        else {
            continue;
        };
        publish_selection_event(
            event,
            &mut store,
            &mut selected_writer,
            &mut opened_writer,
            &mut cleared_writer,
        );
    }
}

/// A refresh that drops or hides the selected node also ends the selection.
/// The camera stays where it is.
pub fn drop_vanished_selection(
    nodes: Res<NodeStore>,
    mut selection: ResMut<SelectionState>,
    mut store: ResMut<OptionsStore>,
    mut selected_writer: MessageWriter<NodeSelected>,
    mut opened_writer: MessageWriter<NodeOpened>,
    mut cleared_writer: MessageWriter<SelectionCleared>,
) {
    if !nodes.is_changed() {
        return;
    }
    let Some(id) = selection.selected().cloned() else {
        return;
    };
    let (root, bodies) = partition_nodes(&nodes.nodes);
    if root.into_iter().chain(bodies).any(|node| node.id == id) {
        return;
    }

    info!("[SELECTION] {} left the node list", id);
    if let Some(event) = selection.click_empty() {
        publish_selection_event(
            event,
            &mut store,
            &mut selected_writer,
            &mut opened_writer,
            &mut cleared_writer,
        );
    }
}

/// Reset requests (keyboard or overlay) clear the selection and fly home.
pub fn handle_reset_requests(
    mut seen: Local<u32>,
    mut selection: ResMut<SelectionState>,
    mut director: ResMut<CameraDirector>,
    mut store: ResMut<OptionsStore>,
    mut selected_writer: MessageWriter<NodeSelected>,
    mut opened_writer: MessageWriter<NodeOpened>,
    mut cleared_writer: MessageWriter<SelectionCleared>,
) {
    if store.reset_key() == *seen {
        return;
    }
    *seen = store.reset_key();

    let reference = store.reference_pose();
    if let Some(event) = reset_view(&mut selection, director.as_mut(), reference) {
        publish_selection_event(
            event,
            &mut store,
            &mut selected_writer,
            &mut opened_writer,
            &mut cleared_writer,
        );
    }
}

fn publish_selection_event(
    event: SelectionEvent,
    store: &mut OptionsStore,
    selected_writer: &mut MessageWriter<NodeSelected>,
    opened_writer: &mut MessageWriter<NodeOpened>,
    cleared_writer: &mut MessageWriter<SelectionCleared>,
) {
    match event {
        SelectionEvent::Selected(id) => {
            info!("[SELECTION] selected {}", id);
            store.set_frozen(true);
            selected_writer.write(NodeSelected { id });
        }
        SelectionEvent::Opened(id) => {
            info!("[SELECTION] opened {}", id);
            opened_writer.write(NodeOpened { id });
        }
        SelectionEvent::Cleared => {
            info!("[SELECTION] cleared");
            store.set_frozen(false);
            cleared_writer.write(SelectionCleared);
        }
    }
}

/// Apply the active flight to the orbit camera, or observe the free camera.
pub fn drive_camera(
    time: Res<Time>,
    mut director: ResMut<CameraDirector>,
    mut cameras: Query<(&mut PanOrbitCamera, &Transform), With<MainCamera>>,
) {
    let Ok((mut poc, transform)) = cameras.single_mut() else {
        return;
    };

    let Some(pose) = director.advance(time.delta_secs()) else {
        director.observe(CameraPose::new(transform.translation, poc.focus));
        return;
    };

    let angles = OrbitAngles::from(&pose);
    poc.focus = angles.focus;
    poc.target_focus = angles.focus;
    poc.radius = Some(angles.radius);
    poc.target_radius = angles.radius;
    poc.yaw = Some(angles.yaw);
    poc.target_yaw = angles.yaw;
    poc.pitch = Some(angles.pitch);
    poc.target_pitch = angles.pitch;
    poc.force_update = true;
}

pub fn persist_camera_pose(
    time: Res<Time>,
    director: Res<CameraDirector>,
    mut throttle: ResMut<PoseSaveThrottle>,
    mut store: ResMut<OptionsStore>,
) {
    if let Some(pose) = throttle.poll(time.delta_secs(), director.pose(), director.is_tweening()) {
        store.save_live_pose(&pose);
    }
}

pub fn update_fov(store: Res<OptionsStore>, mut cameras: Query<&mut Projection, With<MainCamera>>) {
    if !store.is_changed() {
        return;
    }
    let fov = store.options().fish_eye.clamp(10.0, 120.0).to_radians();
    for mut projection in cameras.iter_mut() {
        if let Projection::Perspective(perspective) = projection.as_mut()
            && (perspective.fov - fov).abs() > f32::EPSILON
        {
            perspective.fov = fov;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::MemoryStore;

    #[test]
    fn test_throttle_waits_for_interval() {
        let start = CameraPose::default();
        let mut throttle = PoseSaveThrottle::new(start);
        let moved = CameraPose::new(Vec3::new(3.0, 4.0, 5.0), Vec3::ZERO);
        assert!(throttle.poll(0.1, moved, false).is_none());
        assert!(throttle.poll(0.1, moved, false).is_none());
        assert_eq!(throttle.poll(0.35, moved, false), Some(moved));
        assert!(
            throttle.poll(0.6, moved, false).is_none(),
            "unchanged pose is not saved again"
        );
    }

    #[test]
    fn test_throttle_skips_flights() {
        let mut throttle = PoseSaveThrottle::new(CameraPose::default());
        let moved = CameraPose::new(Vec3::splat(9.0), Vec3::ZERO);
        assert!(throttle.poll(1.0, moved, true).is_none());
        assert_eq!(throttle.poll(1.0, moved, false), Some(moved));
    }

    #[test]
    fn test_reset_request_clears_selection_and_unfreezes() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(OptionsStore::in_memory())
            .insert_resource(CameraDirector::new(CameraPose::default()))
            .insert_resource(SelectionState::default())
            .add_message::<NodeSelected>()
            .add_message::<NodeOpened>()
            .add_message::<SelectionCleared>()
            .add_systems(Update, handle_reset_requests);

        app.world_mut()
            .resource_mut::<SelectionState>()
            .click_body(&"a".to_string());
        app.world_mut()
            .resource_mut::<OptionsStore>()
            .set_frozen(true);
        app.update();
        assert_eq!(
            app.world().resource::<CameraDirector>().flights(),
            0,
            "no reset requested yet"
        );

        app.world_mut().resource_mut::<OptionsStore>().trigger_reset();
        app.update();
        assert!(app.world().resource::<SelectionState>().selected().is_none());
        assert!(!app.world().resource::<OptionsStore>().options().freeze_planets);
        assert_eq!(app.world().resource::<CameraDirector>().flights(), 1);
    }

    #[test]
    fn test_selection_dropped_when_node_leaves_list() {
        use crate::nodes::types::OrganizationNode;

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(OptionsStore::in_memory())
            .init_resource::<NodeStore>()
            .init_resource::<SelectionState>()
            .add_message::<NodeSelected>()
            .add_message::<NodeOpened>()
            .add_message::<SelectionCleared>()
            .add_systems(Update, drop_vanished_selection);

        app.world_mut().resource_mut::<NodeStore>().replace(vec![
            OrganizationNode::planet("a", "A"),
            OrganizationNode::planet("b", "B"),
        ]);
        app.world_mut()
            .resource_mut::<SelectionState>()
            .click_body(&"a".to_string());
        app.world_mut()
            .resource_mut::<OptionsStore>()
            .set_frozen(true);
        app.update();
        assert_eq!(
            app.world().resource::<SelectionState>().selected().map(String::as_str),
            Some("a")
        );

        app.world_mut()
            .resource_mut::<NodeStore>()
            .replace(vec![OrganizationNode::planet("b", "B")]);
        app.update();
        assert!(app.world().resource::<SelectionState>().selected().is_none());
        assert!(!app.world().resource::<OptionsStore>().options().freeze_planets);
        let cleared = app.world().resource::<Messages<SelectionCleared>>();
        assert_eq!(cleared.len(), 1);
    }

    #[test]
    fn test_persist_system_writes_live_keys() {
        let mut app = App::new();
        let moved = CameraPose::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);
        app.add_plugins(MinimalPlugins)
            .insert_resource(OptionsStore::load(Box::new(MemoryStore::new())))
            .insert_resource(CameraDirector::new(moved))
            .insert_resource(PoseSaveThrottle::default())
            .add_systems(Update, persist_camera_pose);

        // Force the interval to elapse regardless of real frame time.
        app.world_mut().resource_mut::<PoseSaveThrottle>().since_check = POSE_SAVE_INTERVAL_SECS;
        app.update();
        let live = app.world().resource::<OptionsStore>().live_pose();
        assert!(live.approx_eq(&moved, 1e-5));
    }
}
