//! Node API worker.

use crate::nodes::types::{
    NodeEvent, NodeId, NodeType, NodesChannels, NodesCommand, NodesFeed, NodesResult, NodePatch,
    OrganizationNode, PlanetType, VisualSource, parse_hex_color, DEFAULT_ORBIT_ROUNDNESS,
    DEFAULT_ORBIT_SPEED, DEFAULT_PLANET_SCALE, DEFAULT_SUN_SCALE,
};
use crate::orbital::geometry::OrbitShape;
use anyhow::{Context, Result};
use bevy::prelude::*;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{
    Arc, Mutex,
    mpsc::{self},
};
use std::thread;

pub fn start_nodes_worker() -> NodesChannels {
    let (cmd_tx, cmd_rx) = mpsc::channel::<NodesCommand>();
    let (res_tx, res_rx) = mpsc::channel::<NodesResult>();

    thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(err) => {
                error!("[NODES] failed to start tokio runtime: {}", err);
                return;
            }
        };
        rt.block_on(async move {
            let client = reqwest::Client::new();

            while let Ok(cmd) = cmd_rx.recv() {
                let (feed, result) = match cmd {
                    NodesCommand::FetchNodes { url } => {
                        let res = fetch_nodes(&client, &url).await.map(NodesResult::Nodes);
                        (NodesFeed::List, res)
                    }
                    NodesCommand::LoadFile { path } => {
                        let res = std::fs::read_to_string(&path)
                            .with_context(|| format!("reading {}", path))
                            .and_then(|body| parse_nodes(&body))
                            .map(NodesResult::Nodes);
                        (NodesFeed::List, res)
                    }
                    NodesCommand::PatchNodes { patches } => {
                        let (saved, failure) = patch_nodes(&client, &patches).await;
                        let res = match failure {
                            Some(err) if saved.is_empty() => Err(err),
                            failure => {
                                if let Some(err) = &failure {
                                    warn!(
                                        "[NODES] save stopped after {} node(s): {:#}",
                                        saved.len(),
                                        err
                                    );
                                }
                                Ok(NodesResult::Patched {
                                    saved,
                                    error: failure.map(|err| err.to_string()),
                                })
                            }
                        };
                        (NodesFeed::Patch, res)
                    }
                };

                let send = |msg| {
                    let _ = res_tx.send(msg);
                };

                match result {
                    Ok(msg) => send(msg),
                    Err(err) => {
                        warn!("[NODES] {:?} request failed: {:#}", feed, err);
                        send(NodesResult::Error {
                            feed,
                            error: err.to_string(),
                        })
                    }
                }
            }
        });
    });

    NodesChannels {
        cmd_tx,
        res_rx: Arc::new(Mutex::new(res_rx)),
    }
}

async fn fetch_nodes(client: &reqwest::Client, url: &str) -> Result<Vec<OrganizationNode>> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        anyhow::bail!("HTTP {} for {}", status, url);
    }
    parse_nodes(&body)
}

/// Send every patch; stops at the first failure.
///
/// Returns the ids saved before the failure alongside it, so a partial save
/// can still be confirmed.
async fn patch_nodes(
    client: &reqwest::Client,
    patches: &[(NodeId, String, NodePatch)],
) -> (Vec<NodeId>, Option<anyhow::Error>) {
    let mut saved = Vec::with_capacity(patches.len());
    for (id, url, patch) in patches {
        if patch.is_empty() {
            continue;
        }
        if let Err(err) = patch_node(client, url, patch).await {
            return (saved, Some(err));
        }
        saved.push(id.clone());
    }
    info!("[NODES] saved {} node(s)", saved.len());
    (saved, None)
}

async fn patch_node(client: &reqwest::Client, url: &str, patch: &NodePatch) -> Result<()> {
    let resp = client.patch(url).json(patch).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("HTTP {} saving {}: {}", status, url, body);
    }
    Ok(())
}

pub fn parse_nodes(body: &str) -> Result<Vec<OrganizationNode>> {
    let value: Value = serde_json::from_str(body)?;
    let items = extract_items(&value);
    let mut nodes = Vec::with_capacity(items.len());

    for item in items {
        let Some(id) = get_id(item, "id") else {
            warn!("[NODES] skipping node without id");
            continue;
        };
        nodes.push(parse_node(item, id));
    }

    Ok(nodes)
}

fn parse_node(item: &Value, id: String) -> OrganizationNode {
    let name = get_string(item, "name").unwrap_or_else(|| "Unnamed".to_string());
    let node_type = get_string_ref(item, "type")
        .map(NodeType::from_api)
        .unwrap_or(NodeType::Branch);
    let mut node = if node_type == NodeType::Root {
        OrganizationNode::root(&id, &name)
    } else {
        OrganizationNode::planet(&id, &name)
    };
    node.node_type = node_type;

    if let Some(slug) = get_string(item, "slug").filter(|s| !s.is_empty()) {
        node.slug = slug;
    }
    node.description = get_string(item, "description").unwrap_or_default();
    node.short_description = get_string(item, "short_description").unwrap_or_default();
    node.cta_text = get_string(item, "cta_text").unwrap_or_default();
    node.cta_url = get_string(item, "cta_url").unwrap_or_default();

    node.visual_source = get_string_ref(item, "visual_source")
        .map(VisualSource::from_api)
        .unwrap_or_default();
    node.planet_type = get_string_ref(item, "planet_type")
        .map(PlanetType::from_api)
        .unwrap_or_default();
    node.model_3d = get_string(item, "model_3d").filter(|s| !s.is_empty());
    node.planet_texture = get_string(item, "planet_texture").filter(|s| !s.is_empty());
    if let Some(color) = get_string_ref(item, "planet_color").and_then(parse_hex_color) {
        node.color = color;
    }

    node.orbit_radius = get_f32(item, "orbit_radius");
    node.orbit_speed = get_f32(item, "orbit_speed").unwrap_or(DEFAULT_ORBIT_SPEED);
    node.planet_scale = if node.is_root() {
        get_f32(item, "planet_scale")
            .unwrap_or(DEFAULT_SUN_SCALE)
            .max(1.0)
    } else {
        get_f32(item, "planet_scale").unwrap_or(DEFAULT_PLANET_SCALE)
    };
    node.rotation_speed = get_f32(item, "rotation_speed");
    node.orbit_phase = get_f32(item, "orbit_phase");
    node.orbit_position_y = get_f32(item, "orbit_position_y");
    node.orbit_shape = get_string_ref(item, "orbit_shape")
        .map(OrbitShape::from_api)
        .unwrap_or_default();
    node.orbit_roundness = get_f32(item, "orbit_roundness").unwrap_or(DEFAULT_ORBIT_ROUNDNESS);
    node.entry_start_x = get_f32(item, "entry_start_x");
    node.entry_start_y = get_f32(item, "entry_start_y");
    node.entry_start_z = get_f32(item, "entry_start_z");
    node.entry_speed = get_f32(item, "entry_speed");
    node.is_visible_3d = get_bool(item, "is_visible_3d").unwrap_or(true);

    node.events = item
        .get("node_events")
        .and_then(|v| v.as_array())
        .map(|events| events.iter().filter_map(parse_event).collect())
        .unwrap_or_default();

    node
}

fn parse_event(item: &Value) -> Option<NodeEvent> {
    Some(NodeEvent {
        id: get_id(item, "id")?,
        title: get_string(item, "title").unwrap_or_else(|| "Untitled".to_string()),
        description: get_string(item, "description").unwrap_or_default(),
        start_utc: get_string_ref(item, "start_datetime").and_then(parse_datetime),
        end_utc: get_string_ref(item, "end_datetime").and_then(parse_datetime),
        location: get_string(item, "location").filter(|s| !s.is_empty()),
        is_featured: get_bool(item, "is_featured").unwrap_or(false),
        external_url: get_string(item, "external_url").filter(|s| !s.is_empty()),
    })
}

fn extract_items(value: &Value) -> Vec<&Value> {
    if let Some(array) = value.as_array() {
        return array.iter().collect();
    }
    value
        .get("results")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().collect())
        .unwrap_or_default()
}

fn get_string(value: &Value, key: &str) -> Option<String> {
    get_string_ref(value, key).map(|s| s.to_string())
}

fn get_string_ref<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

/// Ids arrive as numbers or strings.
fn get_id(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(val)) if !val.is_empty() => Some(val.clone()),
        Some(Value::Number(num)) => Some(num.to_string()),
        _ => None,
    }
}

/// Decimal fields come back from the API as strings.
fn get_f32(value: &Value, key: &str) -> Option<f32> {
    let parsed = match value.get(key) {
        Some(Value::Number(num)) => num.as_f64(),
        Some(Value::String(val)) => val.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    let parsed = parsed as f32;
    parsed.is_finite().then_some(parsed)
}

fn get_bool(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(|v| v.as_bool())
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
