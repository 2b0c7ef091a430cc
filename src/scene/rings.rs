//! Orbit ring and entry path gizmos

use bevy::prelude::*;

use crate::options::OptionsStore;
use crate::orbital::components::OrbitBody;
use crate::orbital::geometry::OrbitCurve;

pub const RING_SEGMENTS: usize = 128;
const ENTRY_PATH_SEGMENTS: usize = 64;

/// Closed polyline along an orbit; the last point repeats the first.
pub fn ring_points(curve: &OrbitCurve, segments: usize) -> Vec<Vec3> {
    let segments = segments.max(3);
    (0..=segments)
        .map(|i| curve.position(std::f32::consts::TAU * (i % segments) as f32 / segments as f32))
        .collect()
}

pub fn draw_orbit_rings(store: Res<OptionsStore>, bodies: Query<&OrbitBody>, mut gizmos: Gizmos) {
    if !store.options().show_orbits {
        return;
    }
    let color = Color::srgba(1.0, 1.0, 1.0, 0.1);
    for body in bodies.iter() {
        let curve = &body.params.slot.curve;
        if curve.radius <= 0.0 {
            continue;
        }
        gizmos.linestrip(ring_points(curve, RING_SEGMENTS), color);
    }
}

/// Path each body still has to fly before joining its orbit.
pub fn draw_entry_paths(store: Res<OptionsStore>, bodies: Query<&OrbitBody>, mut gizmos: Gizmos) {
    if !store.options().show_entry_trajectory {
        return;
    }
    let color = Color::srgba(0.66, 0.33, 0.97, 0.35);
    for body in bodies.iter().filter(|b| !b.state.has_entered_orbit()) {
        gizmos.linestrip(body.params.entry_path(ENTRY_PATH_SEGMENTS), color);
    }
}
