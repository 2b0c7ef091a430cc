//! Per-body simulation: staggered delay, entry animation, then orbit with perturbation.
//!
//! `BodyParams` is derived once from node data and options; `BodyState` is the only
//! part that changes between frames. Neither touches the ECS.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::nodes::types::{NodeId, OrganizationNode};
use crate::options::ExploreOptions;
use crate::orbital::geometry::{Easing, apply_easing, nearest_phase};
use crate::orbital::layout::OrbitSlot;
use crate::orbital::trajectory::{
    EntryProgress, EntryTiming, TrajectoryKind, fan_start, path_length, trajectory_position,
};

/// Delay between consecutive bodies starting their entry.
pub const ENTRY_STAGGER_SECS: f32 = 0.2;
/// Pointer repulsion reach, in world units on the orbital plane.
pub const MOUSE_RADIUS: f32 = 5.0;
const MOUSE_STRENGTH: f32 = 2.0;
const COLLISION_STRENGTH: f32 = 0.5;
const COLLISION_DISTANCE_FACTOR: f32 = 0.8;
/// Forces are skipped below this separation to avoid normalizing a zero vector.
const MIN_FORCE_DISTANCE: f32 = 0.01;
const PATH_SAMPLES: usize = 48;

/// Orbit speed ramp applied after the entry hand-off
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitRamp {
    /// Linear speed at hand-off (units/s)
    pub speed_start: f32,
    /// Linear cruise speed; `None` keeps each node's own angular speed.
    pub speed_target: Option<f32>,
    pub duration: f32,
    pub easing: Easing,
}

impl OrbitRamp {
    pub fn from_options(options: &ExploreOptions) -> Self {
        Self {
            speed_start: options.orbit_speed_start,
            speed_target: options.orbit_speed_target,
            duration: options.orbital_ramp_duration,
            easing: options.orbit_easing,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsParams {
    pub mouse_force: f32,
    pub collision_force: f32,
    pub damping: f32,
}

impl PhysicsParams {
    pub fn from_options(options: &ExploreOptions) -> Self {
        Self {
            mouse_force: options.mouse_force,
            collision_force: options.collision_force,
            damping: options.effective_damping(),
        }
    }
}

/// Convert a linear speed to angular speed on an orbit of `radius`.
///
/// A non-positive radius uses a scale of 1 instead of dividing by zero.
pub fn linear_to_angular(speed: f32, radius: f32) -> f32 {
    if radius > 0.0 && radius.is_finite() {
        speed / radius
    } else {
        speed
    }
}

/// Static description of one body
#[derive(Clone, Debug, PartialEq)]
pub struct BodyParams {
    pub id: NodeId,
    pub index: usize,
    pub slot: OrbitSlot,
    pub scale: f32,
    pub delay: f32,
    pub entry_start: Vec3,
    pub entry_end: Vec3,
    pub trajectory: TrajectoryKind,
    pub timing: EntryTiming,
    pub path_length: f32,
}

impl BodyParams {
    pub fn new(
        node: &OrganizationNode,
        index: usize,
        count: usize,
        options: &ExploreOptions,
    ) -> Self {
        let slot = OrbitSlot::for_node(node, index, count, options);
        let entry_end = slot.curve.position(slot.initial_phase);

        let entry_start = match options.entry_trajectory {
            TrajectoryKind::Fan => fan_start(
                &slot.curve,
                slot.initial_phase,
                options.fan_distance,
                index,
            ),
            _ => Vec3::new(
                node.entry_start_x.unwrap_or(options.entry_start_x),
                node.entry_start_y.unwrap_or(options.entry_start_y),
                node.entry_start_z
                    .or(options.entry_start_z)
                    .unwrap_or(slot.curve.radius),
            ),
        };

        let timing = EntryTiming {
            duration: options.entry_duration,
            speed_start: options.entry_speed_start,
            speed_end: options.entry_speed_end,
            easing: options.entry_easing,
        }
        .with_speed_override(node.entry_speed);

        let scale = node.planet_scale * options.planet_scale.max(0.0);

        Self {
            id: node.id.clone(),
            index,
            slot,
            scale,
            delay: index as f32 * ENTRY_STAGGER_SECS,
            entry_start,
            entry_end,
            trajectory: options.entry_trajectory,
            timing,
            path_length: path_length(
                entry_start,
                entry_end,
                options.entry_trajectory,
                index,
                PATH_SAMPLES,
            ),
        }
    }

    /// Nominal position at the configured phase, used before any live sample exists.
    pub fn resting_position(&self) -> Vec3 {
        self.slot.curve.position(self.slot.initial_phase)
    }

    /// Sampled entry path, for drawing.
    pub fn entry_path(&self, segments: usize) -> Vec<Vec3> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| {
                trajectory_position(
                    i as f32 / segments as f32,
                    self.entry_start,
                    self.entry_end,
                    self.trajectory,
                    self.index,
                )
            })
            .collect()
    }

    /// Angular speed `orbit_time` seconds after hand-off.
    pub fn angular_speed(&self, ramp: &OrbitRamp, orbit_time: f32) -> f32 {
        let radius = self.slot.curve.radius;
        let cruise = ramp
            .speed_target
            .map(|v| linear_to_angular(v, radius))
            .unwrap_or(self.slot.angular_speed);

        if ramp.duration > 0.0 && orbit_time < ramp.duration {
            let start = linear_to_angular(ramp.speed_start, radius);
            let k = apply_easing(orbit_time / ramp.duration, ramp.easing);
            start + (cruise - start) * k
        } else {
            cruise
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyStage {
    Delayed { remaining: f32 },
    Entering { progress: EntryProgress },
    Orbiting { orbit_time: f32 },
}

/// Per-frame inputs shared by every body
pub struct TickContext<'a> {
    pub dt: f32,
    /// Hover dilation multiplier
    pub time_scale: f32,
    pub frozen: bool,
    /// Pointer projected onto the orbital plane
    pub pointer: Option<Vec3>,
    /// Previous frame's live positions
    pub neighbors: &'a HashMap<NodeId, Vec3>,
    pub physics: PhysicsParams,
    pub ramp: OrbitRamp,
}

/// Result of one tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyFrame {
    pub position: Vec3,
    /// Whether the position should be published to the live map.
    pub orbiting: bool,
    /// Set on the frame the body joins its orbit.
    pub handed_off: bool,
}

/// Mutable state of one body
#[derive(Clone, Debug, PartialEq)]
pub struct BodyState {
    pub phase: f32,
    pub perturbation: Vec3,
    pub stage: BodyStage,
    last_position: Vec3,
}

impl BodyState {
    pub fn new(params: &BodyParams) -> Self {
        let stage = if params.delay > 0.0 {
            BodyStage::Delayed {
                remaining: params.delay,
            }
        } else {
            BodyStage::Entering {
                progress: EntryProgress::default(),
            }
        };
        Self {
            phase: params.slot.initial_phase,
            perturbation: Vec3::ZERO,
            stage,
            last_position: params.entry_start,
        }
    }

    pub fn has_entered_orbit(&self) -> bool {
        matches!(self.stage, BodyStage::Orbiting { .. })
    }

    pub fn position(&self) -> Vec3 {
        self.last_position
    }

    pub fn tick(&mut self, params: &BodyParams, ctx: &TickContext) -> BodyFrame {
        let dt = if ctx.dt.is_finite() { ctx.dt.max(0.0) } else { 0.0 };

        match self.stage {
            BodyStage::Delayed { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.stage = BodyStage::Delayed { remaining };
                    return self.finish(params.entry_start, false, false);
                }
                self.stage = BodyStage::Entering {
                    progress: EntryProgress::default(),
                };
                self.finish(params.entry_start, false, false)
            }
            BodyStage::Entering { mut progress } => {
                progress.advance(dt, &params.timing, params.path_length);
                if progress.is_complete() {
                    self.phase = nearest_phase(params.entry_end, &params.slot.curve);
                    self.perturbation = Vec3::ZERO;
                    self.stage = BodyStage::Orbiting { orbit_time: 0.0 };
                    debug!("Body {} entered orbit at phase {:.3}", params.id, self.phase);
                    return self.finish(params.slot.curve.position(self.phase), true, true);
                }
                self.stage = BodyStage::Entering { progress };
                let position = trajectory_position(
                    progress.curve_t(&params.timing),
                    params.entry_start,
                    params.entry_end,
                    params.trajectory,
                    params.index,
                );
                self.finish(position, false, false)
            }
            BodyStage::Orbiting { orbit_time } => {
                let orbit_time = if ctx.frozen { orbit_time } else { orbit_time + dt };
                self.stage = BodyStage::Orbiting { orbit_time };
                let position = self.orbit_step(params, ctx, dt, orbit_time);
                self.finish(position, true, false)
            }
        }
    }

    fn orbit_step(
        &mut self,
        params: &BodyParams,
        ctx: &TickContext,
        dt: f32,
        orbit_time: f32,
    ) -> Vec3 {
        if !ctx.frozen {
            let omega = params.angular_speed(&ctx.ramp, orbit_time);
            let step = omega * ctx.time_scale * dt;
            if step.is_finite() {
                self.phase = (self.phase + step).rem_euclid(std::f32::consts::TAU);
            }
        }

        let nominal = params.slot.curve.position(self.phase);
        let current = nominal + self.perturbation;

        if ctx.physics.mouse_force > 0.0
            && let Some(pointer) = ctx.pointer
        {
            self.perturbation += pointer_force(current, pointer, ctx.physics.mouse_force) * dt;
        }

        if ctx.physics.collision_force > 0.0 {
            let min_distance = (params.scale + 1.0) * COLLISION_DISTANCE_FACTOR;
            for (other_id, other) in ctx.neighbors {
                if *other_id == params.id {
                    continue;
                }
                self.perturbation += collision_force(
                    current,
                    *other,
                    min_distance,
                    ctx.physics.collision_force,
                );
            }
        }

        self.perturbation *= ctx.physics.damping;

        let position = nominal + self.perturbation;
        if position.is_finite() {
            return position;
        }
        self.perturbation = Vec3::ZERO;
        if nominal.is_finite() {
            nominal
        } else {
            self.last_position
        }
    }

    fn finish(&mut self, position: Vec3, orbiting: bool, handed_off: bool) -> BodyFrame {
        if position.is_finite() {
            self.last_position = position;
        }
        BodyFrame {
            position: self.last_position,
            orbiting,
            handed_off,
        }
    }
}

/// Horizontal repulsion away from the pointer, per second.
pub fn pointer_force(position: Vec3, pointer: Vec3, strength: f32) -> Vec3 {
    let mut away = position - pointer;
    away.y = 0.0;
    let distance = away.length();
    if distance >= MOUSE_RADIUS || distance <= MIN_FORCE_DISTANCE {
        return Vec3::ZERO;
    }
    away / distance * ((1.0 - distance / MOUSE_RADIUS) * strength * MOUSE_STRENGTH)
}

/// Horizontal push away from a neighbor closer than `min_distance`, per frame.
pub fn collision_force(position: Vec3, other: Vec3, min_distance: f32, strength: f32) -> Vec3 {
    let mut away = position - other;
    away.y = 0.0;
    let distance = away.length();
    if distance >= min_distance || distance <= MIN_FORCE_DISTANCE {
        return Vec3::ZERO;
    }
    away / distance * ((1.0 - distance / min_distance) * strength * COLLISION_STRENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn node(id: &str) -> OrganizationNode {
        let mut node = OrganizationNode::planet(id, id);
        node.orbit_radius = Some(5.0);
        node.orbit_phase = Some(0.0);
        node
    }

    fn quiet_ctx(neighbors: &HashMap<NodeId, Vec3>) -> TickContext<'_> {
        TickContext {
            dt: 0.016,
            time_scale: 1.0,
            frozen: false,
            pointer: None,
            neighbors,
            physics: PhysicsParams {
                mouse_force: 0.0,
                collision_force: 0.0,
                damping: 0.92,
            },
            ramp: OrbitRamp {
                speed_start: 0.0,
                speed_target: None,
                duration: 0.0,
                easing: Easing::Linear,
            },
        }
    }

    fn run_until_orbiting(state: &mut BodyState, params: &BodyParams, ctx: &TickContext) -> usize {
        for frame in 0..10_000 {
            if state.tick(params, ctx).handed_off {
                return frame;
            }
        }
        panic!("body never reached its orbit");
    }

    #[test]
    fn test_delay_staggers_by_index() {
        let options = ExploreOptions::default();
        let first = BodyParams::new(&node("a"), 0, 3, &options);
        let third = BodyParams::new(&node("c"), 2, 3, &options);
        assert_eq!(first.delay, 0.0);
        assert_relative_eq!(third.delay, 0.4);
        assert!(matches!(BodyState::new(&third).stage, BodyStage::Delayed { .. }));
    }

    #[test]
    fn test_delayed_body_is_pinned_at_start() {
        let options = ExploreOptions::default();
        let params = BodyParams::new(&node("b"), 3, 4, &options);
        let mut state = BodyState::new(&params);
        let neighbors = HashMap::new();
        let frame = state.tick(&params, &quiet_ctx(&neighbors));
        assert_eq!(frame.position, params.entry_start);
        assert!(!frame.orbiting);
        assert_eq!(params.entry_start, Vec3::new(-60.0, 0.0, params.slot.curve.radius));
    }

    #[test]
    fn test_hand_off_is_seamless() {
        for kind in TrajectoryKind::ALL {
            let options = ExploreOptions {
                entry_trajectory: kind,
                ..Default::default()
            };
            let params = BodyParams::new(&node("a"), 0, 1, &options);
            let mut state = BodyState::new(&params);
            let neighbors = HashMap::new();
            let ctx = quiet_ctx(&neighbors);

            let mut before = state.position();
            for _ in 0..10_000 {
                let frame = state.tick(&params, &ctx);
                if frame.handed_off {
                    assert!(
                        frame.position.distance(params.entry_end) < 1e-3,
                        "{kind:?}: hand-off at {:?}, entry ended at {:?}",
                        frame.position,
                        params.entry_end
                    );
                    let next = state.tick(&params, &ctx);
                    assert!(
                        next.position.distance(frame.position) < 0.05,
                        "{kind:?}: jump after hand-off"
                    );
                    break;
                }
                before = frame.position;
            }
            assert!(state.has_entered_orbit(), "{kind:?} never entered");
            assert!(before.is_finite());
        }
    }

    #[test]
    fn test_scenario_orbit_position_at_phase_zero() {
        let options = ExploreOptions::default();
        let roster = vec![OrganizationNode::root("sun", "Sun"), node("a")];
        let (root, bodies) = crate::nodes::types::partition_nodes(&roster);
        assert_eq!(root.map(|r| r.id.as_str()), Some("sun"));
        assert_eq!(bodies.len(), 1);

        // The sun takes no orbit slot, so "a" is index 0 of 1.
        let params = BodyParams::new(bodies[0], 0, bodies.len(), &options);
        assert_eq!(params.index, 0);
        assert!(params.resting_position().distance(Vec3::new(5.0, 0.0, 0.0)) < 1e-5);
    }

    #[test]
    fn test_frozen_body_keeps_phase() {
        let options = ExploreOptions::default();
        let params = BodyParams::new(&node("a"), 0, 1, &options);
        let mut state = BodyState::new(&params);
        let neighbors = HashMap::new();
        let mut ctx = quiet_ctx(&neighbors);
        run_until_orbiting(&mut state, &params, &ctx);

        ctx.frozen = true;
        let phase = state.phase;
        for _ in 0..30 {
            state.tick(&params, &ctx);
        }
        assert_eq!(state.phase, phase);
    }

    #[test]
    fn test_frozen_body_still_feels_pointer() {
        let options = ExploreOptions::default();
        let params = BodyParams::new(&node("a"), 0, 1, &options);
        let mut state = BodyState::new(&params);
        let neighbors = HashMap::new();
        let mut ctx = quiet_ctx(&neighbors);
        run_until_orbiting(&mut state, &params, &ctx);

        ctx.frozen = true;
        ctx.physics.mouse_force = 1.0;
        ctx.pointer = Some(state.position() - Vec3::new(1.0, 0.0, 0.0));
        state.tick(&params, &ctx);
        assert!(state.perturbation.x > 0.0, "pointer should push the body away");
    }

    #[test]
    fn test_dilation_scales_phase_advance() {
        let options = ExploreOptions::default();
        let mut n = node("a");
        // Away from the 0/TAU seam so the phase does not wrap during the test.
        n.orbit_phase = Some(1.0);
        let params = BodyParams::new(&n, 0, 1, &options);
        let neighbors = HashMap::new();

        let mut normal = BodyState::new(&params);
        let mut slowed = BodyState::new(&params);
        let ctx = quiet_ctx(&neighbors);
        run_until_orbiting(&mut normal, &params, &ctx);
        run_until_orbiting(&mut slowed, &params, &ctx);

        let start = normal.phase;
        let slow_ctx = TickContext {
            time_scale: 0.25,
            ..quiet_ctx(&neighbors)
        };
        for _ in 0..10 {
            normal.tick(&params, &ctx);
            slowed.tick(&params, &slow_ctx);
        }
        let normal_advance = normal.phase - start;
        let slowed_advance = slowed.phase - start;
        assert_relative_eq!(slowed_advance * 4.0, normal_advance, epsilon = 1e-5);
    }

    #[test]
    fn test_neighbors_push_apart_and_skip_self() {
        let options = ExploreOptions::default();
        let params = BodyParams::new(&node("a"), 0, 1, &options);
        let mut state = BodyState::new(&params);
        let mut neighbors = HashMap::new();
        {
            let ctx = quiet_ctx(&neighbors);
            run_until_orbiting(&mut state, &params, &ctx);
        }

        let here = state.position();
        neighbors.insert("a".to_string(), here);
        neighbors.insert("b".to_string(), here + Vec3::new(0.0, 0.0, 0.3));
        let ctx = TickContext {
            frozen: true,
            physics: PhysicsParams {
                mouse_force: 0.0,
                collision_force: 1.0,
                damping: 0.92,
            },
            ..quiet_ctx(&neighbors)
        };
        state.tick(&params, &ctx);
        assert!(state.perturbation.z < 0.0, "should move away from b");
        assert_relative_eq!(state.perturbation.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ramp_eases_between_speeds() {
        let options = ExploreOptions {
            orbit_speed_start: 0.0,
            orbit_speed_target: Some(2.0),
            orbital_ramp_duration: 4.0,
            orbit_easing: Easing::Linear,
            ..Default::default()
        };
        let params = BodyParams::new(&node("a"), 0, 1, &options);
        let ramp = OrbitRamp::from_options(&options);
        assert_relative_eq!(params.angular_speed(&ramp, 0.0), 0.0);
        assert_relative_eq!(params.angular_speed(&ramp, 2.0), 0.2);
        assert_relative_eq!(params.angular_speed(&ramp, 10.0), 0.4);
    }

    #[test]
    fn test_zero_radius_uses_unit_scale() {
        assert_eq!(linear_to_angular(3.0, 0.0), 3.0);
        assert_eq!(linear_to_angular(3.0, -1.0), 3.0);
        assert_eq!(linear_to_angular(3.0, 1.5), 2.0);
    }

    #[test]
    fn test_non_finite_perturbation_is_reset() {
        let options = ExploreOptions::default();
        let params = BodyParams::new(&node("a"), 0, 1, &options);
        let mut state = BodyState::new(&params);
        let neighbors = HashMap::new();
        let ctx = quiet_ctx(&neighbors);
        run_until_orbiting(&mut state, &params, &ctx);

        state.perturbation = Vec3::new(f32::NAN, 0.0, 0.0);
        let frame = state.tick(&params, &ctx);
        assert!(frame.position.is_finite());
        assert_eq!(state.perturbation, Vec3::ZERO);
    }

    #[test]
    fn test_node_overrides_entry_start_and_speed() {
        let mut n = node("a");
        n.entry_start_x = Some(-10.0);
        n.entry_start_z = Some(2.0);
        n.entry_speed = Some(7.0);
        let params = BodyParams::new(&n, 0, 1, &ExploreOptions::default());
        assert_eq!(params.entry_start, Vec3::new(-10.0, 0.0, 2.0));
        assert_eq!(params.timing.speed_start, 7.0);
    }

    proptest! {
        #[test]
        fn prop_perturbation_decays_geometrically(
            x in -5.0f32..5.0,
            y in -5.0f32..5.0,
            z in -5.0f32..5.0,
            damping in 0.5f32..0.99,
            steps in 1usize..200,
        ) {
            let options = ExploreOptions::default();
            let params = BodyParams::new(&node("a"), 0, 1, &options);
            let mut state = BodyState::new(&params);
            let neighbors = HashMap::new();
            let ctx = quiet_ctx(&neighbors);
            run_until_orbiting(&mut state, &params, &ctx);

            let ctx = TickContext {
                physics: PhysicsParams { mouse_force: 0.0, collision_force: 0.0, damping },
                ..quiet_ctx(&neighbors)
            };
            let initial = Vec3::new(x, y, z);
            state.perturbation = initial;
            for _ in 0..steps {
                state.tick(&params, &ctx);
            }
            let bound = initial.length() * damping.powi(steps as i32);
            prop_assert!(state.perturbation.length() <= bound * (1.0 + 1e-4) + 1e-12);
        }
    }
}
