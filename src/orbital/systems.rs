//! ECS adapters: feed the pure body simulation and write the results to transforms.

use bevy::prelude::*;

use crate::core::SimulationClock;
use crate::options::OptionsStore;
use crate::orbital::body::{OrbitRamp, PhysicsParams, TickContext};
use crate::orbital::components::{OrbitBody, SunBody};
use crate::orbital::dilation::{HoverDilation, HoverKind, ray_hits_orbital_disk};
use crate::orbital::geometry::OrbitShape;
use crate::orbital::positions::LivePositions;
use crate::scene::pointer::PointerProbe;

/// Advance every body one frame and publish the orbiting ones.
pub fn tick_bodies(
    clock: Res<SimulationClock>,
    store: Res<OptionsStore>,
    dilation: Res<HoverDilation>,
    probe: Res<PointerProbe>,
    mut positions: ResMut<LivePositions>,
    mut bodies: Query<(&mut OrbitBody, &mut Transform)>,
) {
    positions.commit();
    let neighbors = positions.snapshot().clone();
    let options = store.options();

    let ctx = TickContext {
        dt: clock.dt,
        time_scale: dilation.factor(),
        frozen: options.freeze_planets,
        pointer: probe.plane_point,
        neighbors: &neighbors,
        physics: PhysicsParams::from_options(options),
        ramp: OrbitRamp::from_options(options),
    };

    for (mut body, mut transform) in bodies.iter_mut() {
        let OrbitBody { params, state } = body.as_mut();
        let frame = state.tick(params, &ctx);
        transform.translation = frame.position;
        if frame.orbiting {
            positions.publish(&params.id, frame.position);
        }
    }
}

/// Ease the global dilation toward whatever the pointer is over.
pub fn update_hover_dilation(
    clock: Res<SimulationClock>,
    store: Res<OptionsStore>,
    probe: Res<PointerProbe>,
    bodies: Query<&OrbitBody>,
    mut dilation: ResMut<HoverDilation>,
) {
    let options = store.options();
    let kind = if probe.hovered.is_some() {
        HoverKind::Planet
    } else if let Some(ray) = probe.ray {
        let (max_radius, envelope) = disk_extent(bodies.iter());
        if ray_hits_orbital_disk(
            ray.origin,
            *ray.direction,
            max_radius,
            envelope,
            options.hover_disk_margin,
        ) {
            HoverKind::Orbit
        } else {
            HoverKind::None
        }
    } else {
        HoverKind::None
    };

    dilation.update(kind, clock.dt, options);
}

/// Largest horizontal reach and vertical spread of all orbits.
fn disk_extent<'a>(bodies: impl Iterator<Item = &'a OrbitBody>) -> (f32, f32) {
    bodies.fold((0.0_f32, 0.0_f32), |(radius, envelope), body| {
        let curve = &body.params.slot.curve;
        let reach = match curve.shape {
            OrbitShape::Circle => curve.radius,
            OrbitShape::Squircle => curve.radius * std::f32::consts::SQRT_2,
        };
        (
            radius.max(reach),
            envelope.max(curve.vertical_offset.abs()),
        )
    })
}

pub fn spin_sun(
    clock: Res<SimulationClock>,
    store: Res<OptionsStore>,
    dilation: Res<HoverDilation>,
    mut suns: Query<(&SunBody, &mut Transform)>,
) {
    if store.options().freeze_planets {
        return;
    }
    for (sun, mut transform) in suns.iter_mut() {
        let angle = sun.spin_speed * dilation.factor() * clock.dt;
        if angle.is_finite() {
            transform.rotate_y(angle);
        }
    }
}
