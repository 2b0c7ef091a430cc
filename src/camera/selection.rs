//! Selection state machine and the camera flights it triggers

use bevy::prelude::*;

use crate::camera::director::CameraHandle;
use crate::camera::pose::CameraPose;
use crate::camera::tween::{CAMERA_TWEEN_EASING, CAMERA_TWEEN_SECS};
use crate::nodes::types::{NodeId, NodeStore, OrganizationNode};

const FOCUS_BASE_DISTANCE: f32 = 8.0;
const FOCUS_DISTANCE_PER_SCALE: f32 = 2.0;
const FOCUS_LIFT_RATIO: f32 = 0.2;

/// A body was selected; the camera is flying to it.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct NodeSelected {
    pub id: NodeId,
}

/// The selected body was clicked again.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct NodeOpened {
    pub id: NodeId,
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCleared;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
    Selected(NodeId),
    Opened(NodeId),
    Cleared,
}

/// Only source of truth for the selected node.
#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<NodeId>,
}

impl SelectionState {
    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn click_body(&mut self, id: &NodeId) -> SelectionEvent {
        if self.selected.as_ref() == Some(id) {
            return SelectionEvent::Opened(id.clone());
        }
        self.selected = Some(id.clone());
        SelectionEvent::Selected(id.clone())
    }

    /// Clicking empty space only matters while something is selected.
    pub fn click_empty(&mut self) -> Option<SelectionEvent> {
        self.selected.take().map(|_| SelectionEvent::Cleared)
    }

    pub fn selected_node<'a>(&self, store: &'a NodeStore) -> Option<&'a OrganizationNode> {
        self.selected.as_deref().and_then(|id| store.get(id))
    }
}

/// What a click landed on.
#[derive(Clone, Debug, PartialEq)]
pub enum ClickTarget {
    Body {
        id: NodeId,
        /// Live position, or the nominal one when no live sample exists
        focus: Vec3,
        scale: f32,
    },
    Empty,
}

/// Pose that frames a body of `scale` at `focus`.
pub fn focus_pose(focus: Vec3, scale: f32) -> CameraPose {
    let scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
    let zoom = FOCUS_BASE_DISTANCE + FOCUS_DISTANCE_PER_SCALE * scale;
    CameraPose {
        position: focus + Vec3::new(0.0, FOCUS_LIFT_RATIO * zoom, zoom),
        target: focus,
    }
}

/// Apply one click to the selection and start the matching camera flight.
pub fn handle_click(
    selection: &mut SelectionState,
    target: ClickTarget,
    camera: &mut impl CameraHandle,
    reference: CameraPose,
) -> Option<SelectionEvent> {
    match target {
        ClickTarget::Body { id, focus, scale } => {
            let event = selection.click_body(&id);
            if matches!(event, SelectionEvent::Selected(_)) {
                camera.tween_to(focus_pose(focus, scale), CAMERA_TWEEN_SECS, CAMERA_TWEEN_EASING);
            }
            Some(event)
        }
        ClickTarget::Empty => {
            let event = selection.click_empty()?;
            camera.tween_to(reference, CAMERA_TWEEN_SECS, CAMERA_TWEEN_EASING);
            Some(event)
        }
    }
}

/// Drop any selection and fly back to the reference pose.
pub fn reset_view(
    selection: &mut SelectionState,
    camera: &mut impl CameraHandle,
    reference: CameraPose,
) -> Option<SelectionEvent> {
    let event = selection.click_empty();
    camera.tween_to(reference, CAMERA_TWEEN_SECS, CAMERA_TWEEN_EASING);
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::director::CameraDirector;
    use crate::orbital::geometry::Easing;

    /// Records requests without moving.
    #[derive(Default)]
    struct RecordingCamera {
        requests: Vec<CameraPose>,
    }

    impl CameraHandle for RecordingCamera {
        fn pose(&self) -> CameraPose {
            CameraPose::default()
        }
        fn tween_to(&mut self, pose: CameraPose, _duration: f32, _easing: Easing) {
            self.requests.push(pose);
        }
        fn cancel_tween(&mut self) {}
        fn is_tweening(&self) -> bool {
            !self.requests.is_empty()
        }
    }

    fn body(id: &str, focus: Vec3) -> ClickTarget {
        ClickTarget::Body {
            id: id.to_string(),
            focus,
            scale: 1.0,
        }
    }

    #[test]
    fn test_focus_pose_offset() {
        let pose = focus_pose(Vec3::new(5.0, 0.0, 0.0), 1.0);
        assert_eq!(pose.target, Vec3::new(5.0, 0.0, 0.0));
        assert!((pose.position - Vec3::new(5.0, 2.0, 10.0)).length() < 1e-5);
    }

    #[test]
    fn test_select_then_open() {
        let mut selection = SelectionState::default();
        let mut camera = RecordingCamera::default();
        let reference = CameraPose::default();

        let event = handle_click(&mut selection, body("p1", Vec3::X * 5.0), &mut camera, reference);
        assert_eq!(event, Some(SelectionEvent::Selected("p1".into())));
        assert_eq!(camera.requests.len(), 1);

        let event = handle_click(&mut selection, body("p1", Vec3::X * 5.0), &mut camera, reference);
        assert_eq!(event, Some(SelectionEvent::Opened("p1".into())));
        assert_eq!(camera.requests.len(), 1, "opening does not move the camera");
        assert_eq!(selection.selected().map(String::as_str), Some("p1"));
    }

    #[test]
    fn test_switching_bodies_retargets() {
        let mut selection = SelectionState::default();
        let mut camera = RecordingCamera::default();
        handle_click(&mut selection, body("a", Vec3::X), &mut camera, CameraPose::default());
        let event = handle_click(&mut selection, body("b", Vec3::Z), &mut camera, CameraPose::default());
        assert_eq!(event, Some(SelectionEvent::Selected("b".into())));
        assert_eq!(camera.requests.len(), 2);
        assert_eq!(camera.requests[1].target, Vec3::Z);
    }

    #[test]
    fn test_empty_click_clears_and_returns_to_reference() {
        let mut selection = SelectionState::default();
        let mut camera = RecordingCamera::default();
        let reference = CameraPose::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);

        assert_eq!(
            handle_click(&mut selection, ClickTarget::Empty, &mut camera, reference),
            None,
            "empty click with nothing selected is a no-op"
        );
        assert!(camera.requests.is_empty());

        handle_click(&mut selection, body("a", Vec3::X), &mut camera, reference);
        let event = handle_click(&mut selection, ClickTarget::Empty, &mut camera, reference);
        assert_eq!(event, Some(SelectionEvent::Cleared));
        assert_eq!(camera.requests.len(), 2, "one flight out, one flight back");
        assert_eq!(camera.requests.last(), Some(&reference));
        assert!(selection.selected().is_none());
    }

    #[test]
    fn test_rapid_clicks_leave_one_flight() {
        let mut selection = SelectionState::default();
        let mut director = CameraDirector::new(CameraPose::default());
        handle_click(&mut selection, body("a", Vec3::X * 5.0), &mut director, CameraPose::default());
        director.advance(0.1);
        handle_click(&mut selection, body("b", Vec3::Z * 7.0), &mut director, CameraPose::default());
        assert_eq!(director.destination().map(|p| p.target), Some(Vec3::Z * 7.0));
    }

    #[test]
    fn test_selected_node_lookup() {
        let mut store = NodeStore::default();
        store.replace(vec![OrganizationNode::planet("a", "Alpha")]);
        let mut selection = SelectionState::default();
        assert!(selection.selected_node(&store).is_none());
        selection.click_body(&"a".to_string());
        assert_eq!(selection.selected_node(&store).map(|n| n.name.as_str()), Some("Alpha"));
        selection.click_body(&"gone".to_string());
        assert!(selection.selected_node(&store).is_none());
    }

    #[test]
    fn test_reset_view_always_flies_home() {
        let mut selection = SelectionState::default();
        let mut camera = RecordingCamera::default();
        assert_eq!(reset_view(&mut selection, &mut camera, CameraPose::default()), None);
        assert_eq!(camera.requests.len(), 1);
    }
}
