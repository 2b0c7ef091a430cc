//! Detail overlay for the selected node and a small status line

use bevy::prelude::*;
use chrono::{DateTime, Utc};

use crate::camera::selection::{NodeOpened, NodeSelected, SelectionCleared, SelectionState};
use crate::nodes::types::{NodeStore, NodesState, OrganizationNode, PendingPatches};
use crate::options::OptionsStore;

const PANEL_WIDTH: f32 = 360.0;
const MAX_LISTED_EVENTS: usize = 3;

/// Whether the detail view of the selected node is expanded.
#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub struct OverlayState {
    pub opened: bool,
}

#[derive(Component)]
pub struct OverlayPanel;

#[derive(Component)]
pub struct OverlayText;

#[derive(Component)]
pub struct StatusText;

pub fn spawn_overlay(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(16.0),
                right: Val::Px(16.0),
                width: Val::Px(PANEL_WIDTH),
                padding: UiRect::all(Val::Px(12.0)),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            BackgroundColor(Color::srgba(0.04, 0.03, 0.08, 0.85)),
            Visibility::Hidden,
            OverlayPanel,
        ))
        .with_children(|panel| {
            panel.spawn((
                Text::new(""),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::srgb(0.92, 0.9, 0.98)),
                OverlayText,
            ));
        });

    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
        Text::new(""),
        TextFont {
            font_size: 12.0,
            ..default()
        },
        TextColor(Color::srgba(0.8, 0.8, 0.85, 0.8)),
        StatusText,
    ));
}

/// Expand or collapse the detail view from selection messages.
pub fn track_overlay_messages(
    mut selected: MessageReader<NodeSelected>,
    mut opened: MessageReader<NodeOpened>,
    mut cleared: MessageReader<SelectionCleared>,
    mut overlay: ResMut<OverlayState>,
) {
    if selected.read().count() > 0 || cleared.read().count() > 0 {
        overlay.opened = false;
    }
    if opened.read().count() > 0 {
        overlay.opened = true;
    }
}

pub fn overlay_text(node: &OrganizationNode, opened: bool, now: DateTime<Utc>) -> String {
    let mut text = node.name.clone();
    if !node.short_description.is_empty() {
        text.push('\n');
        text.push_str(&node.short_description);
    }
    if !opened {
        text.push_str("\n\nClick again or press Enter for details");
        return text;
    }

    if !node.description.is_empty() {
        text.push_str("\n\n");
        text.push_str(&node.description);
    }
    if !node.cta_text.is_empty() || !node.cta_url.is_empty() {
        let label = if node.cta_text.is_empty() {
            "Learn more"
        } else {
            node.cta_text.as_str()
        };
        text.push_str(&format!("\n\n{label}: {}", node.cta_url));
    }

    let mut upcoming: Vec<_> = node
        .events
        .iter()
        .filter(|e| e.end_utc.or(e.start_utc).is_none_or(|t| t >= now))
        .collect();
    upcoming.sort_by_key(|e| (!e.is_featured, e.start_utc));
    if !upcoming.is_empty() {
        text.push_str("\n\nUpcoming");
        for event in upcoming.into_iter().take(MAX_LISTED_EVENTS) {
            text.push_str("\n- ");
            text.push_str(&event.title);
            if let Some(start) = event.start_utc {
                text.push_str(&format!(" ({})", start.format("%Y-%m-%d %H:%M")));
            }
            if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
                text.push_str(&format!(" @ {location}"));
            }
        }
    }
    text
}

pub fn status_text(
    state: &NodesState,
    pending: &PendingPatches,
    store: &OptionsStore,
    node_count: usize,
) -> Option<String> {
    let options = store.options();
    let mut parts = Vec::new();
    if let Some(error) = &state.error {
        parts.push(format!("Error: {error}"));
    }
    if state.is_loading {
        parts.push("Loading nodes...".to_string());
    }
    if state.is_saving {
        parts.push("Saving...".to_string());
    }
    let staged = pending.count();
    if staged > 0 {
        parts.push(format!("{staged} unsaved change(s), press S to save"));
    }
    if options.show_debug_info {
        parts.push(format!(
            "nodes {node_count} | trajectory {:?} | frozen {} | restart #{}",
            options.entry_trajectory,
            options.freeze_planets,
            store.restart_key()
        ));
    }
    (!parts.is_empty()).then(|| parts.join("  |  "))
}

#[allow(clippy::type_complexity)]
pub fn render_overlay(
    selection: Res<SelectionState>,
    nodes: Res<NodeStore>,
    overlay: Res<OverlayState>,
    nodes_state: Res<NodesState>,
    pending: Res<PendingPatches>,
    store: Res<OptionsStore>,
    mut panels: Query<&mut Visibility, With<OverlayPanel>>,
    mut texts: ParamSet<(
        Query<&mut Text, With<OverlayText>>,
        Query<&mut Text, With<StatusText>>,
    )>,
) {
    let selected = selection.selected_node(&nodes);
    let wanted = if selected.is_some() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    for mut visibility in panels.iter_mut() {
        if *visibility != wanted {
            *visibility = wanted;
        }
    }

    if let Some(node) = selected {
        let body = overlay_text(node, overlay.opened, Utc::now());
        for mut text in texts.p0().iter_mut() {
            if text.0 != body {
                text.0 = body.clone();
            }
        }
    }

    let status =
        status_text(&nodes_state, &pending, &store, nodes.nodes.len()).unwrap_or_default();
    for mut text in texts.p1().iter_mut() {
        if text.0 != status {
            text.0 = status.clone();
        }
    }
}
