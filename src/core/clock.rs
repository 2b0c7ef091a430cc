//! Frame clock for the simulation

use bevy::prelude::*;

/// Longest step the simulation accepts, so a resumed window does not teleport bodies.
pub const MAX_FRAME_SECS: f32 = 0.033;

/// Clamped per-frame step shared by every simulation system
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    pub dt: f32,
    pub elapsed: f32,
}

impl SimulationClock {
    pub fn step(&mut self, delta_secs: f32) {
        self.dt = if delta_secs.is_finite() {
            delta_secs.clamp(0.0, MAX_FRAME_SECS)
        } else {
            0.0
        };
        self.elapsed += self.dt;
    }
}

/// System to advance the simulation clock from Bevy's frame time
pub fn advance_simulation_clock(time: Res<Time>, mut clock: ResMut<SimulationClock>) {
    clock.step(time.delta_secs());
}
