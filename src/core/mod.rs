//! Frame ordering and the shared simulation clock.

use bevy::prelude::*;

pub mod clock;

pub use clock::{SimulationClock, advance_simulation_clock};

/// Per-frame ordering of the explore scene.
///
/// Data arrives, the scene is rebuilt if needed, pointer input is read, bodies tick,
/// the camera reacts, and finally everything derived is drawn.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum ExploreSet {
    Data,
    Scene,
    Input,
    Simulation,
    Camera,
    Presentation,
}

pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimulationClock>()
            .configure_sets(
                Update,
                (
                    ExploreSet::Data,
                    ExploreSet::Scene,
                    ExploreSet::Input,
                    ExploreSet::Simulation,
                    ExploreSet::Camera,
                    ExploreSet::Presentation,
                )
                    .chain(),
            )
            .add_systems(Update, advance_simulation_clock.before(ExploreSet::Data));
    }
}
