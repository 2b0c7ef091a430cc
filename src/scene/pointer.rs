//! Pointer ray, hovered body, and hover/selection highlight

use bevy::picking::events::{Out, Over, Pointer};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::camera::MainCamera;
use crate::camera::selection::SelectionState;
use crate::orbital::components::{ExploreNode, SunBody};
use crate::scene::visual::HaloShell;

const BODY_HIGHLIGHT_SCALE: f32 = 1.15;
const SUN_HIGHLIGHT_SCALE: f32 = 1.1;

/// Where the pointer is this frame
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct PointerProbe {
    /// Camera ray through the cursor
    pub ray: Option<Ray3d>,
    /// Cursor projected onto the orbital plane (y = 0)
    pub plane_point: Option<Vec3>,
    /// Node entity under the cursor
    pub hovered: Option<Entity>,
}

/// Intersect a ray with the horizontal plane through the origin.
pub fn project_to_orbital_plane(ray: Ray3d) -> Option<Vec3> {
    let distance = ray.intersect_plane(Vec3::ZERO, InfinitePlane3d::new(Vec3::Y))?;
    let point = ray.get_point(distance);
    point.is_finite().then_some(point)
}

pub fn update_pointer_ray(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut probe: ResMut<PointerProbe>,
) {
    probe.ray = None;
    probe.plane_point = None;

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, camera_transform)) = cameras.single() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(camera_transform, cursor) else {
        return;
    };

    probe.ray = Some(ray);
    probe.plane_point = project_to_orbital_plane(ray);
}

pub fn track_hovered_node(
    mut over: MessageReader<Pointer<Over>>,
    mut out: MessageReader<Pointer<Out>>,
    nodes: Query<(), With<ExploreNode>>,
    parents: Query<&ChildOf>,
    mut probe: ResMut<PointerProbe>,
) {
    let node_root = |mut entity: Entity| loop {
        if nodes.contains(entity) {
            return Some(entity);
        }
        match parents.get(entity) {
            Ok(parent) => entity = parent.parent(),
            Err(_) => return None,
        }
    };

    for ev in out.read() {
        if node_root(ev.entity).is_some_and(|e| probe.hovered == Some(e)) {
            probe.hovered = None;
        }
    }
    for ev in over.read() {
        if let Some(entity) = node_root(ev.entity) {
            probe.hovered = Some(entity);
        }
    }

    if probe.hovered.is_some_and(|e| !nodes.contains(e)) {
        probe.hovered = None;
    }
}

pub fn apply_highlight(
    probe: Res<PointerProbe>,
    selection: Res<SelectionState>,
    mut nodes: Query<(Entity, &ExploreNode, &mut Transform, Has<SunBody>)>,
    mut halos: Query<(&ChildOf, &mut Visibility), With<HaloShell>>,
) {
    let highlighted = |entity: Entity, node: &ExploreNode| {
        probe.hovered == Some(entity) || selection.selected() == Some(&node.id)
    };

    for (entity, node, mut transform, is_sun) in nodes.iter_mut() {
        let factor = match (highlighted(entity, node), is_sun) {
            (false, _) => 1.0,
            (true, true) => SUN_HIGHLIGHT_SCALE,
            (true, false) => BODY_HIGHLIGHT_SCALE,
        };
        let scale = Vec3::splat(factor);
        if transform.scale != scale {
            transform.scale = scale;
        }
    }

    for (parent, mut visibility) in halos.iter_mut() {
        let lit = nodes
            .get(parent.parent())
            .is_ok_and(|(entity, node, _, _)| highlighted(entity, node));
        let wanted = if lit { Visibility::Inherited } else { Visibility::Hidden };
        if *visibility != wanted {
            *visibility = wanted;
        }
    }
}
