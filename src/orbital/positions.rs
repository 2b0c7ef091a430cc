//! Shared map of live body positions

use bevy::prelude::*;
use std::collections::HashMap;

use crate::nodes::types::NodeId;

/// Live positions of orbiting bodies.
///
/// Bodies publish into the pending frame; collision checks read the snapshot of the
/// previous frame, so the order in which bodies tick never matters.
#[derive(Resource, Debug, Default)]
pub struct LivePositions {
    snapshot: HashMap<NodeId, Vec3>,
    pending: HashMap<NodeId, Vec3>,
}

impl LivePositions {
    /// Record this frame's position of one body.
    pub fn publish(&mut self, id: &NodeId, position: Vec3) {
        if position.is_finite() {
            self.pending.insert(id.clone(), position);
        }
    }

    /// End of frame: the pending positions become the snapshot.
    pub fn commit(&mut self) {
        self.snapshot = std::mem::take(&mut self.pending);
    }

    /// Previous frame's positions.
    pub fn snapshot(&self) -> &HashMap<NodeId, Vec3> {
        &self.snapshot
    }

    /// Most recent known position, this frame's if already published.
    pub fn latest(&self, id: &str) -> Option<Vec3> {
        self.pending
            .get(id)
            .or_else(|| self.snapshot.get(id))
            .copied()
    }

    pub fn clear(&mut self) {
        self.snapshot.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_lags_one_frame() {
        let mut positions = LivePositions::default();
        let a: NodeId = "a".into();
        positions.publish(&a, Vec3::X);
        assert!(positions.snapshot().is_empty());
        assert_eq!(positions.latest("a"), Some(Vec3::X));

        positions.commit();
        assert_eq!(positions.snapshot().get("a"), Some(&Vec3::X));

        positions.publish(&a, Vec3::Y);
        assert_eq!(positions.snapshot().get("a"), Some(&Vec3::X));
        assert_eq!(positions.latest("a"), Some(Vec3::Y));
    }

    #[test]
    fn test_unpublished_bodies_drop_out() {
        let mut positions = LivePositions::default();
        positions.publish(&"a".into(), Vec3::X);
        positions.commit();
        positions.commit();
        assert_eq!(positions.latest("a"), None);
    }

    #[test]
    fn test_non_finite_positions_are_ignored() {
        let mut positions = LivePositions::default();
        positions.publish(&"a".into(), Vec3::new(f32::NAN, 0.0, 0.0));
        positions.commit();
        assert_eq!(positions.len(), 0);
    }
}
