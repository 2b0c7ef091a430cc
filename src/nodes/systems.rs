//! Node list systems (request + apply + save-back).

use crate::nodes::fetcher::start_nodes_worker;
use crate::nodes::types::{
    NodeStore, NodesChannels, NodesCommand, NodesConfig, NodesFeed, NodesResult, NodesState,
    PendingPatches,
};
use crate::options::OptionsStore;
use bevy::prelude::*;
use chrono::Utc;

/// Asks the worker to persist staged patches.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct SubmitPatches;

pub fn setup_nodes_worker(mut commands: Commands) {
    let channels = start_nodes_worker();
    info!("[INIT] Node worker started");
    commands.insert_resource(channels);
}

pub fn request_nodes(
    config: Res<NodesConfig>,
    mut state: ResMut<NodesState>,
    channels: Option<Res<NodesChannels>>,
) {
    let Some(channels) = channels else { return };
    if state.requested && !state.force_refresh {
        return;
    }

    let cmd = match &config.nodes_file {
        Some(path) => NodesCommand::LoadFile { path: path.clone() },
        None => NodesCommand::FetchNodes {
            url: config.list_url(),
        },
    };
    if let Err(err) = channels.cmd_tx.send(cmd) {
        state.error = Some(format!("Failed to queue node fetch: {}", err));
        state.is_loading = false;
    } else {
        state.is_loading = true;
        state.error = None;
    }
    state.requested = true;
    state.force_refresh = false;
}

pub fn submit_patches(
    mut submits: MessageReader<SubmitPatches>,
    config: Res<NodesConfig>,
    store: Res<NodeStore>,
    mut pending: ResMut<PendingPatches>,
    mut state: ResMut<NodesState>,
    channels: Option<Res<NodesChannels>>,
) {
    if submits.read().count() == 0 {
        return;
    }
    let Some(channels) = channels else { return };
    if pending.count() == 0 || state.is_saving || pending.is_saving() {
        return;
    }

    let batch = pending.begin_save();
    let mut patches = Vec::with_capacity(batch.len());
    for (id, patch) in batch {
        match store.get(&id) {
            Some(node) => patches.push((id, config.node_url(&node.slug), patch)),
            // Node vanished from the list; nothing left to save.
            None => {
                pending.in_flight.remove(&id);
            }
        }
    }

    if let Err(err) = channels.cmd_tx.send(NodesCommand::PatchNodes { patches }) {
        pending.restore_in_flight();
        state.error = Some(format!("Failed to queue node save: {}", err));
    } else {
        state.is_saving = true;
    }
}

pub fn apply_node_results(
    mut store: ResMut<NodeStore>,
    mut state: ResMut<NodesState>,
    mut pending: ResMut<PendingPatches>,
    mut options: ResMut<OptionsStore>,
    channels: Option<Res<NodesChannels>>,
) {
    let Some(channels) = channels else { return };
    let Ok(guard) = channels.res_rx.lock() else {
        return;
    };

    while let Ok(msg) = guard.try_recv() {
        match msg {
            NodesResult::Nodes(nodes) => {
                info!("[NODES] loaded {} node(s)", nodes.len());
                store.replace(nodes);
                state.last_update = Some(Utc::now());
                state.is_loading = false;
                state.error = None;
            }
            NodesResult::Patched { saved, error } => {
                state.is_saving = false;
                pending.finish_save(&saved);
                if !saved.is_empty() {
                    state.force_refresh = true;
                    options.trigger_restart();
                }
                state.error = error;
            }
            NodesResult::Error { feed, error } => {
                match feed {
                    NodesFeed::List => state.is_loading = false,
                    NodesFeed::Patch => {
                        state.is_saving = false;
                        pending.restore_in_flight();
                    }
                }
                state.error = Some(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::types::{NodePatch, OrganizationNode};
    use std::sync::{Arc, Mutex, mpsc};

    fn test_app() -> (App, mpsc::Receiver<NodesCommand>, mpsc::Sender<NodesResult>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (res_tx, res_rx) = mpsc::channel();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<SubmitPatches>()
            .insert_resource(NodesChannels {
                cmd_tx,
                res_rx: Arc::new(Mutex::new(res_rx)),
            })
            .insert_resource(OptionsStore::in_memory())
            .init_resource::<NodesConfig>()
            .init_resource::<NodesState>()
            .init_resource::<NodeStore>()
            .init_resource::<PendingPatches>()
            .add_systems(
                Update,
                (request_nodes, submit_patches, apply_node_results).chain(),
            );
        (app, cmd_rx, res_tx)
    }

    #[test]
    fn test_nodes_requested_once() {
        let (mut app, cmd_rx, _res_tx) = test_app();
        app.update();
        app.update();
        let sent: Vec<_> = cmd_rx.try_iter().collect();
        assert_eq!(sent.len(), 1, "node list should be requested once");
        assert!(matches!(&sent[0], NodesCommand::FetchNodes { url } if url.ends_with("/api/organization/nodes/")));
    }

    #[test]
    fn test_results_replace_store() {
        let (mut app, _cmd_rx, res_tx) = test_app();
        res_tx
            .send(NodesResult::Nodes(vec![OrganizationNode::planet("a", "A")]))
            .expect("send");
        app.update();
        let store = app.world().resource::<NodeStore>();
        assert_eq!(store.nodes.len(), 1);
        assert_eq!(store.revision, 1);
        assert!(!app.world().resource::<NodesState>().is_loading);
    }

    #[test]
    fn test_successful_save_refetches_and_restarts() {
        let (mut app, cmd_rx, res_tx) = test_app();
        app.world_mut()
            .resource_mut::<NodeStore>()
            .replace(vec![OrganizationNode::planet("a", "A")]);
        app.world_mut().resource_mut::<PendingPatches>().stage(
            &"a".to_string(),
            NodePatch {
                orbit_radius: Some(9.0),
                ..Default::default()
            },
        );
        app.update();
        app.world_mut().write_message(SubmitPatches);
        app.update();

        let sent: Vec<_> = cmd_rx.try_iter().collect();
        let patch = sent.iter().find_map(|cmd| match cmd {
            NodesCommand::PatchNodes { patches } => Some(patches.clone()),
            _ => None,
        });
        let patches = patch.expect("patch command sent");
        assert_eq!(patches.len(), 1);
        assert!(patches[0].1.ends_with("/api/organization/nodes/a/"));
        assert!(app.world().resource::<PendingPatches>().patches.is_empty());
        assert!(app.world().resource::<PendingPatches>().in_flight.contains_key("a"));

        let restart_before = app.world().resource::<OptionsStore>().restart_key();
        res_tx
            .send(NodesResult::Patched {
                saved: vec!["a".into()],
                error: None,
            })
            .expect("send");
        app.update();
        assert_ne!(
            app.world().resource::<OptionsStore>().restart_key(),
            restart_before,
            "a successful save should replay the intro"
        );
        app.update();
        assert!(
            cmd_rx
                .try_iter()
                .any(|cmd| matches!(cmd, NodesCommand::FetchNodes { .. })),
            "a successful save should refetch the node list"
        );
        assert!(app.world().resource::<PendingPatches>().in_flight.is_empty());
    }

    fn stage_radius(app: &mut App, id: &str, radius: f32) {
        app.world_mut().resource_mut::<PendingPatches>().stage(
            &id.to_string(),
            NodePatch {
                orbit_radius: Some(radius),
                ..Default::default()
            },
        );
    }

    #[test]
    fn test_failed_save_keeps_staged_patches() {
        let (mut app, _cmd_rx, res_tx) = test_app();
        app.world_mut()
            .resource_mut::<NodeStore>()
            .replace(vec![OrganizationNode::planet("a", "A")]);
        stage_radius(&mut app, "a", 9.0);
        app.update();
        app.world_mut().write_message(SubmitPatches);
        app.update();
        assert_eq!(app.world().resource::<PendingPatches>().count(), 0);

        // Edited again while the save was running.
        stage_radius(&mut app, "a", 9.5);
        res_tx
            .send(NodesResult::Error {
                feed: NodesFeed::Patch,
                error: "HTTP 502".into(),
            })
            .expect("send");
        app.update();

        let pending = app.world().resource::<PendingPatches>();
        assert_eq!(pending.count(), 1);
        assert!(pending.in_flight.is_empty());
        assert_eq!(pending.patches["a"].orbit_radius, Some(9.5));
        let state = app.world().resource::<NodesState>();
        assert!(!state.is_saving);
        assert_eq!(state.error.as_deref(), Some("HTTP 502"));
    }

    #[test]
    fn test_partial_save_refetches_and_keeps_unsaved() {
        let (mut app, cmd_rx, res_tx) = test_app();
        app.world_mut().resource_mut::<NodeStore>().replace(vec![
            OrganizationNode::planet("a", "A"),
            OrganizationNode::planet("b", "B"),
        ]);
        stage_radius(&mut app, "a", 6.0);
        stage_radius(&mut app, "b", 7.0);
        app.update();
        app.world_mut().write_message(SubmitPatches);
        app.update();
        let _ = cmd_rx.try_iter().count();

        let restart_before = app.world().resource::<OptionsStore>().restart_key();
        res_tx
            .send(NodesResult::Patched {
                saved: vec!["a".into()],
                error: Some("HTTP 500 saving b".into()),
            })
            .expect("send");
        app.update();

        let pending = app.world().resource::<PendingPatches>();
        assert_eq!(pending.count(), 1);
        assert!(pending.patches.contains_key("b"));
        assert!(!pending.patches.contains_key("a"));
        assert_ne!(
            app.world().resource::<OptionsStore>().restart_key(),
            restart_before
        );
        assert!(app.world().resource::<NodesState>().error.is_some());
        app.update();
        assert!(
            cmd_rx
                .try_iter()
                .any(|cmd| matches!(cmd, NodesCommand::FetchNodes { .. }))
        );
    }

    #[test]
    fn test_fetch_error_is_recorded() {
        let (mut app, _cmd_rx, res_tx) = test_app();
        res_tx
            .send(NodesResult::Error {
                feed: NodesFeed::List,
                error: "HTTP 500".into(),
            })
            .expect("send");
        app.update();
        let state = app.world().resource::<NodesState>();
        assert_eq!(state.error.as_deref(), Some("HTTP 500"));
        assert!(!state.is_loading);
    }
}
