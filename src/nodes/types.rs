use bevy::prelude::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    mpsc::{Receiver, Sender},
};

use crate::orbital::geometry::OrbitShape;

pub type NodeId = String;

pub const DEFAULT_PLANET_COLOR: &str = "#a855f7";
pub const DEFAULT_SUN_COLOR: &str = "#fbbf24";
pub const DEFAULT_PLANET_SCALE: f32 = 0.6;
pub const DEFAULT_SUN_SCALE: f32 = 1.2;
pub const DEFAULT_ORBIT_SPEED: f32 = 0.1;
pub const DEFAULT_ORBIT_ROUNDNESS: f32 = 0.6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeType {
    Root,
    Branch,
    Event,
    Other(String),
}

impl NodeType {
    pub fn from_api(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "ROOT" => NodeType::Root,
            "BRANCH" => NodeType::Branch,
            "EVENT" => NodeType::Event,
            _ => NodeType::Other(value.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisualSource {
    #[default]
    Preset,
    GlbModel,
    Gif,
}

impl VisualSource {
    pub fn from_api(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "glb" | "glb-model" | "model" => VisualSource::GlbModel,
            "gif" | "image" => VisualSource::Gif,
            _ => VisualSource::Preset,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlanetType {
    #[default]
    Glass,
    Wire,
    Dotted,
    Chrome,
    Network,
    Star,
}

impl PlanetType {
    pub fn from_api(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "wire" => PlanetType::Wire,
            "dotted" => PlanetType::Dotted,
            "chrome" => PlanetType::Chrome,
            "network" => PlanetType::Network,
            "star" => PlanetType::Star,
            _ => PlanetType::Glass,
        }
    }
}

/// Parse `#rgb` / `#rrggbb` (the `#` is optional).
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().trim_start_matches('#');
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let (r, g, b) = match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_digit(16));
            let r = digits.next()??;
            let g = digits.next()??;
            let b = digits.next()??;
            ((r * 17) as u8, (g * 17) as u8, (b * 17) as u8)
        }
        6 => (
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        ),
        _ => return None,
    };
    Some(Color::srgb_u8(r, g, b))
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_utc: Option<DateTime<Utc>>,
    pub end_utc: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub is_featured: bool,
    pub external_url: Option<String>,
}

/// One organization node with every nullable field already defaulted, except the
/// orbit values whose default depends on the body's index.
#[derive(Clone, Debug, PartialEq)]
pub struct OrganizationNode {
    pub id: NodeId,
    pub name: String,
    pub slug: String,
    pub node_type: NodeType,
    pub description: String,
    pub short_description: String,
    pub cta_text: String,
    pub cta_url: String,
    pub visual_source: VisualSource,
    pub planet_type: PlanetType,
    pub model_3d: Option<String>,
    pub planet_texture: Option<String>,
    pub color: Color,
    pub orbit_radius: Option<f32>,
    /// Angular speed in rad/s
    pub orbit_speed: f32,
    pub planet_scale: f32,
    pub rotation_speed: Option<f32>,
    pub orbit_phase: Option<f32>,
    pub orbit_position_y: Option<f32>,
    pub orbit_shape: OrbitShape,
    pub orbit_roundness: f32,
    pub entry_start_x: Option<f32>,
    pub entry_start_y: Option<f32>,
    pub entry_start_z: Option<f32>,
    pub entry_speed: Option<f32>,
    pub is_visible_3d: bool,
    pub events: Vec<NodeEvent>,
}

impl OrganizationNode {
    /// Orbiting node with every field at its default.
    pub fn planet(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            slug: id.to_string(),
            node_type: NodeType::Branch,
            description: String::new(),
            short_description: String::new(),
            cta_text: String::new(),
            cta_url: String::new(),
            visual_source: VisualSource::Preset,
            planet_type: PlanetType::Glass,
            model_3d: None,
            planet_texture: None,
            color: parse_hex_color(DEFAULT_PLANET_COLOR).unwrap_or(Color::WHITE),
            orbit_radius: None,
            orbit_speed: DEFAULT_ORBIT_SPEED,
            planet_scale: DEFAULT_PLANET_SCALE,
            rotation_speed: None,
            orbit_phase: None,
            orbit_position_y: None,
            orbit_shape: OrbitShape::Circle,
            orbit_roundness: DEFAULT_ORBIT_ROUNDNESS,
            entry_start_x: None,
            entry_start_y: None,
            entry_start_z: None,
            entry_speed: None,
            is_visible_3d: true,
            events: Vec::new(),
        }
    }

    /// Central node with sun defaults.
    pub fn root(id: &str, name: &str) -> Self {
        Self {
            node_type: NodeType::Root,
            color: parse_hex_color(DEFAULT_SUN_COLOR).unwrap_or(Color::WHITE),
            planet_scale: DEFAULT_SUN_SCALE,
            ..Self::planet(id, name)
        }
    }

    pub fn is_root(&self) -> bool {
        self.node_type == NodeType::Root
    }
}

/// Split visible nodes into the sun (first root) and the ordered orbiting bodies.
pub fn partition_nodes(nodes: &[OrganizationNode]) -> (Option<&OrganizationNode>, Vec<&OrganizationNode>) {
    let mut root = None;
    let mut bodies = Vec::new();
    for node in nodes.iter().filter(|n| n.is_visible_3d) {
        if node.is_root() {
            if root.is_none() {
                root = Some(node);
            } else {
                warn!("Ignoring extra root node {}", node.id);
            }
        } else {
            bodies.push(node);
        }
    }
    (root, bodies)
}

/// Partial save-back of one node's orbit parameters. Unset fields are not sent.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbit_radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbit_speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planet_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbit_shape: Option<OrbitShape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbit_roundness: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_visible_3d: Option<bool>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        *self == NodePatch::default()
    }

    /// Later values win.
    pub fn merge(&mut self, other: NodePatch) {
        self.orbit_radius = other.orbit_radius.or(self.orbit_radius);
        self.orbit_speed = other.orbit_speed.or(self.orbit_speed);
        self.planet_scale = other.planet_scale.or(self.planet_scale);
        self.orbit_shape = other.orbit_shape.or(self.orbit_shape);
        self.orbit_roundness = other.orbit_roundness.or(self.orbit_roundness);
        self.is_visible_3d = other.is_visible_3d.or(self.is_visible_3d);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodesFeed {
    List,
    Patch,
}

pub enum NodesCommand {
    FetchNodes { url: String },
    LoadFile { path: String },
    /// `(node id, node url, patch)` triples, sent in order.
    PatchNodes { patches: Vec<(NodeId, String, NodePatch)> },
}

pub enum NodesResult {
    Nodes(Vec<OrganizationNode>),
    /// Some or all patches were saved. `error` is set when the batch stopped early.
    Patched {
        saved: Vec<NodeId>,
        error: Option<String>,
    },
    Error { feed: NodesFeed, error: String },
}

#[derive(Resource)]
pub struct NodesChannels {
    pub cmd_tx: Sender<NodesCommand>,
    pub res_rx: Arc<Mutex<Receiver<NodesResult>>>,
}

#[derive(Resource, Debug, Clone)]
pub struct NodesConfig {
    pub base_url: String,
    pub nodes_file: Option<String>,
}

impl Default for NodesConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            nodes_file: None,
        }
    }
}

impl NodesConfig {
    /// Read `EXPLORE_API_URL` and `EXPLORE_NODES_FILE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("EXPLORE_API_URL")
            && !url.trim().is_empty()
        {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        config.nodes_file = std::env::var("EXPLORE_NODES_FILE")
            .ok()
            .filter(|p| !p.trim().is_empty());
        config
    }

    pub fn list_url(&self) -> String {
        format!("{}/api/organization/nodes/", self.base_url)
    }

    pub fn node_url(&self, slug: &str) -> String {
        format!("{}/api/organization/nodes/{}/", self.base_url, slug)
    }
}

#[derive(Resource, Debug, Default)]
pub struct NodesState {
    pub is_loading: bool,
    pub is_saving: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub force_refresh: bool,
    pub requested: bool,
}

/// Current node list. `revision` changes whenever the list is replaced.
#[derive(Resource, Debug, Default)]
pub struct NodeStore {
    pub nodes: Vec<OrganizationNode>,
    pub revision: u64,
}

impl NodeStore {
    pub fn replace(&mut self, nodes: Vec<OrganizationNode>) {
        self.nodes = nodes;
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn get(&self, id: &str) -> Option<&OrganizationNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Apply a staged edit locally so the scene previews it before saving.
    pub fn apply_patch(&mut self, id: &str, patch: &NodePatch) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if let Some(radius) = patch.orbit_radius {
            node.orbit_radius = Some(radius);
        }
        if let Some(speed) = patch.orbit_speed {
            node.orbit_speed = speed;
        }
        if let Some(scale) = patch.planet_scale {
            node.planet_scale = scale;
        }
        if let Some(shape) = patch.orbit_shape {
            node.orbit_shape = shape;
        }
        if let Some(roundness) = patch.orbit_roundness {
            node.orbit_roundness = roundness;
        }
        if let Some(visible) = patch.is_visible_3d {
            node.is_visible_3d = visible;
        }
        self.revision = self.revision.wrapping_add(1);
        true
    }
}

/// Staged node edits awaiting an explicit save.
#[derive(Resource, Debug, Default)]
pub struct PendingPatches {
    pub patches: HashMap<NodeId, NodePatch>,
    /// Patches handed to the worker and not yet confirmed.
    pub in_flight: HashMap<NodeId, NodePatch>,
}

impl PendingPatches {
    pub fn stage(&mut self, id: &NodeId, patch: NodePatch) {
        self.patches.entry(id.clone()).or_default().merge(patch);
    }

    /// Move every staged patch into the in-flight slot and return the batch.
    pub fn begin_save(&mut self) -> Vec<(NodeId, NodePatch)> {
        let batch: Vec<_> = self
            .patches
            .drain()
            .filter(|(_, patch)| !patch.is_empty())
            .collect();
        self.in_flight
            .extend(batch.iter().map(|(id, patch)| (id.clone(), patch.clone())));
        batch
    }

    /// Drop confirmed patches and stage the rest again; newer edits win.
    pub fn finish_save(&mut self, saved: &[NodeId]) {
        for id in saved {
            self.in_flight.remove(id);
        }
        self.restore_in_flight();
    }

    pub fn restore_in_flight(&mut self) {
        for (id, mut patch) in self.in_flight.drain() {
            if let Some(newer) = self.patches.remove(&id) {
                patch.merge(newer);
            }
            self.patches.insert(id, patch);
        }
    }

    pub fn is_saving(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn count(&self) -> usize {
        self.patches.values().filter(|p| !p.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        let long = parse_hex_color("#a855f7").expect("valid hex").to_srgba();
        assert!((long.red - 168.0 / 255.0).abs() < 1e-6);
        let short = parse_hex_color("fff").expect("valid short hex").to_srgba();
        assert_eq!(short.red, 1.0);
        assert!(parse_hex_color("#12345").is_none());
        assert!(parse_hex_color("zzzzzz").is_none());
        assert!(parse_hex_color("").is_none());
    }

    #[test]
    fn test_partition_keeps_first_root_and_hides_invisible() {
        let mut hidden = OrganizationNode::planet("h", "Hidden");
        hidden.is_visible_3d = false;
        let nodes = vec![
            OrganizationNode::planet("a", "A"),
            OrganizationNode::root("sun", "Sun"),
            hidden,
            OrganizationNode::root("sun2", "Second sun"),
            OrganizationNode::planet("b", "B"),
        ];
        let (root, bodies) = partition_nodes(&nodes);
        assert_eq!(root.map(|r| r.id.as_str()), Some("sun"));
        let ids: Vec<&str> = bodies.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_partition_without_root() {
        let nodes = vec![OrganizationNode::planet("a", "A")];
        let (root, bodies) = partition_nodes(&nodes);
        assert!(root.is_none());
        assert_eq!(bodies.len(), 1);
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = NodePatch {
            orbit_radius: Some(7.5),
            orbit_shape: Some(OrbitShape::Squircle),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"orbit_radius": 7.5, "orbit_shape": "squircle"})
        );
    }

    #[test]
    fn test_staged_patches_merge() {
        let mut pending = PendingPatches::default();
        let id: NodeId = "a".into();
        pending.stage(&id, NodePatch {
            orbit_radius: Some(4.0),
            ..Default::default()
        });
        pending.stage(&id, NodePatch {
            orbit_radius: Some(5.0),
            planet_scale: Some(1.0),
            ..Default::default()
        });
        assert_eq!(pending.count(), 1);
        let patch = &pending.patches[&id];
        assert_eq!(patch.orbit_radius, Some(5.0));
        assert_eq!(patch.planet_scale, Some(1.0));
    }

    #[test]
    fn test_node_type_is_case_insensitive() {
        assert_eq!(NodeType::from_api("root"), NodeType::Root);
        assert_eq!(
            NodeType::from_api("GALAXY"),
            NodeType::Other("GALAXY".to_string())
        );
    }

    #[test]
    fn test_apply_patch_bumps_revision() {
        let mut store = NodeStore::default();
        store.replace(vec![OrganizationNode::planet("a", "A")]);
        let before = store.revision;

        let patch = NodePatch {
            orbit_radius: Some(7.5),
            ..Default::default()
        };
        assert!(store.apply_patch("a", &patch));
        assert_eq!(store.get("a").and_then(|n| n.orbit_radius), Some(7.5));
        assert_ne!(store.revision, before);

        assert!(!store.apply_patch("missing", &patch), "unknown ids are ignored");
    }
}
