//! Keeps scene entities in step with the node list
//!
//! Bodies are keyed by node id. A data refresh keeps each surviving body's simulation
//! state and only rebuilds what changed; a restart key change respawns everything so
//! the entry choreography replays.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::nodes::types::{NodeId, NodeStore, OrganizationNode, partition_nodes};
use crate::options::{ExploreOptions, OptionsStore};
use crate::orbital::body::BodyParams;
use crate::orbital::components::{ExploreNode, OrbitBody, SunBody};
use crate::orbital::positions::LivePositions;
use crate::scene::pointer::PointerProbe;
use crate::scene::visual::{
    HaloShell, ModelPlaceholder, PendingModel, PlanetVisual, VisualAssets, VisualBuild,
};

const DEFAULT_SUN_SPIN: f32 = 0.15;

/// What a node's visual was built from; a change means the visual is rebuilt.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct VisualKey {
    pub sun: bool,
    pub visual: PlanetVisual,
    pub color: [f32; 4],
    pub scale: f32,
}

impl VisualKey {
    pub fn for_node(node: &OrganizationNode, sun: bool, scale: f32) -> Self {
        Self {
            sun,
            visual: PlanetVisual::from_node(node),
            color: node.color.to_srgba().to_f32_array(),
            scale,
        }
    }
}

/// Diff between live entities and the wanted roster
#[derive(Debug, Default, PartialEq)]
pub struct RosterPlan {
    /// Same visual; only parameters refresh.
    pub keep: Vec<(Entity, usize)>,
    /// Same node, different visual; children are rebuilt, state kept.
    pub rebuild: Vec<(Entity, usize)>,
    pub spawn: Vec<usize>,
    pub despawn: Vec<Entity>,
}

pub fn plan_roster(existing: &[(Entity, NodeId, VisualKey)], wanted: &[(NodeId, VisualKey)]) -> RosterPlan {
    let mut live: HashMap<&str, (Entity, &VisualKey)> = existing
        .iter()
        .map(|(entity, id, key)| (id.as_str(), (*entity, key)))
        .collect();
    let mut plan = RosterPlan::default();

    for (index, (id, key)) in wanted.iter().enumerate() {
        match live.remove(id.as_str()) {
            Some((entity, old)) if old == key => plan.keep.push((entity, index)),
            Some((entity, old)) if old.sun == key.sun => plan.rebuild.push((entity, index)),
            Some((entity, _)) => {
                plan.despawn.push(entity);
                plan.spawn.push(index);
            }
            None => plan.spawn.push(index),
        }
    }
    plan.despawn.extend(live.into_values().map(|(entity, _)| entity));
    plan
}

/// Last scene inputs applied
#[derive(Default)]
pub struct AppliedScene {
    revision: Option<u64>,
    restart_key: u32,
    layout: Option<ExploreOptions>,
}

enum Role {
    Sun,
    Body(Box<BodyParams>),
}

struct Wanted<'a> {
    node: &'a OrganizationNode,
    role: Role,
    key: VisualKey,
}

fn wanted_roster<'a>(nodes: &'a [OrganizationNode], options: &ExploreOptions) -> Vec<Wanted<'a>> {
    let (root, bodies) = partition_nodes(nodes);
    let mut wanted = Vec::with_capacity(bodies.len() + 1);
    if let Some(root) = root {
        wanted.push(Wanted {
            node: root,
            role: Role::Sun,
            key: VisualKey::for_node(root, true, root.planet_scale),
        });
    }
    let count = bodies.len();
    for (index, node) in bodies.into_iter().enumerate() {
        let params = BodyParams::new(node, index, count, options);
        let key = VisualKey::for_node(node, false, params.scale);
        wanted.push(Wanted {
            node,
            role: Role::Body(Box::new(params)),
            key,
        });
    }
    wanted
}

#[allow(clippy::too_many_arguments)]
pub fn sync_scene(
    mut commands: Commands,
    nodes: Res<NodeStore>,
    store: Res<OptionsStore>,
    mut applied: Local<AppliedScene>,
    mut existing: Query<(Entity, &ExploreNode, &VisualKey, Option<&mut OrbitBody>)>,
    mut positions: ResMut<LivePositions>,
    mut probe: ResMut<PointerProbe>,
    mut assets: VisualAssets,
) {
    let mut layout = store.options().clone();
    layout.freeze_planets = false;

    let restart = applied.restart_key != store.restart_key();
    let data_changed = applied.revision != Some(nodes.revision);
    let layout_changed = applied.layout.as_ref() != Some(&layout);
    if !(restart || data_changed || layout_changed) {
        return;
    }
    applied.restart_key = store.restart_key();
    applied.revision = Some(nodes.revision);

    let wanted = wanted_roster(&nodes.nodes, &layout);
    applied.layout = Some(layout);

    if restart {
        for (entity, ..) in existing.iter() {
            commands.entity(entity).despawn();
        }
        positions.clear();
        probe.hovered = None;
        for item in wanted {
            spawn_node(&mut commands, &mut assets, item);
        }
        info!("[SCENE] restarted with {} node(s)", nodes.nodes.len());
        return;
    }

    let current: Vec<_> = existing
        .iter()
        .map(|(entity, node, key, _)| (entity, node.id.clone(), key.clone()))
        .collect();
    let wanted_keys: Vec<_> = wanted
        .iter()
        .map(|w| (w.node.id.clone(), w.key.clone()))
        .collect();
    let plan = plan_roster(&current, &wanted_keys);

    for entity in &plan.despawn {
        if probe.hovered == Some(*entity) {
            probe.hovered = None;
        }
        commands.entity(*entity).despawn();
    }

    let mut wanted: Vec<Option<Wanted>> = wanted.into_iter().map(Some).collect();
    for (entity, index) in plan.keep.iter().chain(plan.rebuild.iter()) {
        let Some(item) = wanted[*index].take() else { continue };
        let rebuild = plan.rebuild.contains(&(*entity, *index));
        let Ok((_, _, _, body)) = existing.get_mut(*entity) else {
            continue;
        };
        if let (Some(mut body), Role::Body(params)) = (body, &item.role) {
            body.params = params.as_ref().clone();
        }
        commands.entity(*entity).insert(ExploreNode {
            id: item.node.id.clone(),
            base_scale: item.key.scale,
        });
        if rebuild {
            commands.entity(*entity).despawn_children().remove::<PendingModel>();
            let build = build_visual(&mut assets, &item);
            attach_visual(&mut commands, *entity, build);
            commands.entity(*entity).insert(item.key);
        }
    }
    for index in plan.spawn {
        if let Some(item) = wanted[index].take() {
            spawn_node(&mut commands, &mut assets, item);
        }
    }
}

fn build_visual(assets: &mut VisualAssets, item: &Wanted) -> VisualBuild {
    match item.role {
        Role::Sun => assets.sun(item.key.scale, item.node.color),
        Role::Body(_) => item.key.visual.build(item.key.scale, item.node.color, assets),
    }
}

fn spawn_node(commands: &mut Commands, assets: &mut VisualAssets, item: Wanted) {
    let build = build_visual(assets, &item);
    let explore = ExploreNode {
        id: item.node.id.clone(),
        base_scale: item.key.scale,
    };
    let name = Name::new(item.node.name.clone());

    let entity = match item.role {
        Role::Sun => commands
            .spawn((
                name,
                explore,
                SunBody {
                    spin_speed: item.node.rotation_speed.unwrap_or(DEFAULT_SUN_SPIN),
                },
                item.key,
                Transform::default(),
                Visibility::default(),
            ))
            .id(),
        Role::Body(params) => {
            let start = params.entry_start;
            commands
                .spawn((
                    name,
                    explore,
                    OrbitBody::new(*params),
                    item.key,
                    Transform::from_translation(start),
                    Visibility::default(),
                ))
                .id()
        }
    };
    attach_visual(commands, entity, build);
}

fn attach_visual(commands: &mut Commands, entity: Entity, build: VisualBuild) {
    let VisualBuild {
        parts,
        scene,
        pick_shell,
        halo,
    } = build;

    commands.entity(entity).with_children(|parent| {
        for part in parts {
            let mut child = parent.spawn((
                Mesh3d(part.mesh),
                MeshMaterial3d(part.material),
                part.transform,
            ));
            if let Some(spark) = part.spark {
                child.insert(spark);
            }
            if part.placeholder {
                child.insert(ModelPlaceholder);
            }
        }
        if let Some((handle, transform)) = &scene {
            parent.spawn((SceneRoot(handle.clone()), *transform));
        }
        if let Some(shell) = pick_shell {
            parent.spawn((
                Mesh3d(shell.mesh),
                MeshMaterial3d(shell.material),
                shell.transform,
                Pickable::default(),
            ));
        }
        if let Some(halo) = halo {
            parent.spawn((
                Mesh3d(halo.mesh),
                MeshMaterial3d(halo.material),
                halo.transform,
                HaloShell,
                Visibility::Hidden,
                Pickable::IGNORE,
            ));
        }
    });

    if let Some((handle, _)) = scene {
        commands.entity(entity).insert(PendingModel {
            url: handle
                .path()
                .map(|p| p.to_string())
                .unwrap_or_default(),
            handle,
        });
    }
}
