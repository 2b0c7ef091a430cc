use bevy::prelude::*;

use crate::nodes::types::NodeId;
use crate::orbital::body::{BodyParams, BodyState};

/// Node shown in the scene, on the sun or on an orbiting body.
#[derive(Component, Debug, Clone)]
pub struct ExploreNode {
    pub id: NodeId,
    /// Displayed scale before hover highlight
    pub base_scale: f32,
}

/// Simulated orbiting body
#[derive(Component, Debug, Clone)]
pub struct OrbitBody {
    pub params: BodyParams,
    pub state: BodyState,
}

impl OrbitBody {
    pub fn new(params: BodyParams) -> Self {
        let state = BodyState::new(&params);
        Self { params, state }
    }
}

/// Central body spinning in place
#[derive(Component, Debug, Clone, Copy)]
pub struct SunBody {
    /// rad/s before dilation
    pub spin_speed: f32,
}
