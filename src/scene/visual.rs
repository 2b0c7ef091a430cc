//! Per-node visuals
//!
//! Every variant builds parts already scaled for the body; the spawner only parents
//! them under the body entity. Procedural meshes are generated here so line
//! and point styles need no asset files.

use bevy::asset::{LoadState, RenderAssetUsages};
use bevy::ecs::system::SystemParam;
use bevy::gltf::GltfAssetLabel;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::nodes::types::{OrganizationNode, PlanetType, VisualSource};

const WIRE_SUBDIVISIONS: u32 = 2;
const DOT_COUNT: usize = 160;
const DOT_RADIUS: f32 = 0.035;
const NETWORK_NODES: usize = 36;
const NETWORK_NEIGHBORS: usize = 3;
const STAR_SPARKS: usize = 6;
const PICK_SHELL_RADIUS: f32 = 1.1;
const HALO_RADIUS: f32 = 1.3;

#[derive(Clone, Debug, PartialEq)]
pub enum PlanetVisual {
    Wire,
    Dotted,
    Glass,
    Chrome,
    Network,
    Star,
    ExternalModel(String),
    ImagePlane(String),
}

impl PlanetVisual {
    /// Resolve the visual for a node; a missing asset URL falls back to the preset.
    pub fn from_node(node: &OrganizationNode) -> Self {
        let url = match node.visual_source {
            VisualSource::GlbModel => node.model_3d.as_deref(),
            VisualSource::Gif => node.planet_texture.as_deref(),
            VisualSource::Preset => None,
        }
        .map(str::trim)
        .filter(|url| !url.is_empty());

        match (node.visual_source, url) {
            (VisualSource::GlbModel, Some(url)) => PlanetVisual::ExternalModel(url.to_string()),
            (VisualSource::Gif, Some(url)) => PlanetVisual::ImagePlane(url.to_string()),
            _ => Self::preset(node.planet_type),
        }
    }

    pub fn preset(planet_type: PlanetType) -> Self {
        match planet_type {
            PlanetType::Wire => PlanetVisual::Wire,
            PlanetType::Dotted => PlanetVisual::Dotted,
            PlanetType::Glass => PlanetVisual::Glass,
            PlanetType::Chrome => PlanetVisual::Chrome,
            PlanetType::Network => PlanetVisual::Network,
            PlanetType::Star => PlanetVisual::Star,
        }
    }

    pub fn build(&self, scale: f32, color: Color, assets: &mut VisualAssets) -> VisualBuild {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let sized = Transform::from_scale(Vec3::splat(scale));
        let mut build = VisualBuild::default();

        match self {
            PlanetVisual::Wire => {
                build.push(assets.wire_sphere(), assets.unlit(color), sized);
            }
            PlanetVisual::Dotted => {
                let mesh = assets.meshes.add(dot_cloud_mesh(&fibonacci_sphere(DOT_COUNT), DOT_RADIUS));
                build.push(mesh, assets.unlit(color), sized);
            }
            PlanetVisual::Glass => {
                let material = assets.materials.add(StandardMaterial {
                    base_color: color.with_alpha(0.35),
                    alpha_mode: AlphaMode::Blend,
                    specular_transmission: 0.9,
                    perceptual_roughness: 0.05,
                    reflectance: 0.6,
                    ..default()
                });
                build.push(assets.sphere(), material, sized);
            }
            PlanetVisual::Chrome => {
                let material = assets.materials.add(StandardMaterial {
                    base_color: color,
                    metallic: 1.0,
                    perceptual_roughness: 0.12,
                    ..default()
                });
                build.push(assets.sphere(), material, sized);
            }
            PlanetVisual::Network => {
                let points = fibonacci_sphere(NETWORK_NODES);
                let edges = nearest_neighbor_edges(&points, NETWORK_NEIGHBORS);
                let material = assets.unlit(color);
                let dots = assets.meshes.add(dot_cloud_mesh(&points, DOT_RADIUS * 1.5));
                let lines = assets.meshes.add(line_mesh(&points, &edges));
                build.push(dots, material.clone(), sized);
                build.push(lines, material, sized);
            }
            PlanetVisual::Star => {
                let material = assets.unlit(color);
                build.push(assets.wire_sphere(), material.clone(), sized.with_scale(Vec3::splat(scale * 0.6)));
                let spark_mesh = assets.meshes.add(Sphere::new(0.06).mesh().uv(24, 16));
                for i in 0..STAR_SPARKS {
                    let spark = Spark {
                        radius: scale * (0.9 + 0.1 * (i % 3) as f32),
                        speed: 1.2 + 0.35 * i as f32,
                        phase: i as f32 * std::f32::consts::TAU / STAR_SPARKS as f32,
                        tilt: (i as f32 * 0.7).sin() * 0.6,
                    };
                    build.parts.push(VisualPart {
                        mesh: spark_mesh.clone(),
                        material: material.clone(),
                        transform: Transform::from_translation(spark.offset(0.0))
                            .with_scale(Vec3::splat(scale)),
                        spark: Some(spark),
                        placeholder: false,
                    });
                }
            }
            PlanetVisual::ExternalModel(url) => {
                let handle: Handle<Scene> = assets
                    .asset_server
                    .load(GltfAssetLabel::Scene(0).from_asset(url.clone()));
                build.scene = Some((handle, sized));
                build.parts.push(VisualPart {
                    mesh: assets.wire_sphere(),
                    material: assets.unlit(color.with_alpha(0.6)),
                    transform: sized,
                    spark: None,
                    placeholder: true,
                });
            }
            PlanetVisual::ImagePlane(url) => {
                let texture: Handle<Image> = assets.asset_server.load(url.clone());
                let material = assets.materials.add(StandardMaterial {
                    base_color_texture: Some(texture),
                    alpha_mode: AlphaMode::Blend,
                    double_sided: true,
                    cull_mode: None,
                    unlit: true,
                    ..default()
                });
                let plane = assets.meshes.add(Rectangle::new(2.0, 2.0));
                build.push(plane, material, sized);
            }
        }

        build.pick_shell = Some(assets.pick_shell(scale));
        build.halo = Some(assets.halo(scale, color));
        build
    }
}

/// Mesh + material with its local transform
#[derive(Clone, Debug)]
pub struct VisualPart {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
    pub transform: Transform,
    pub spark: Option<Spark>,
    /// Shown only until an external model finishes loading.
    pub placeholder: bool,
}

#[derive(Clone, Debug, Default)]
pub struct VisualBuild {
    pub parts: Vec<VisualPart>,
    pub scene: Option<(Handle<Scene>, Transform)>,
    /// Invisible sphere so line and point styles stay clickable.
    pub pick_shell: Option<VisualPart>,
    pub halo: Option<VisualPart>,
}

impl VisualBuild {
    fn push(&mut self, mesh: Handle<Mesh>, material: Handle<StandardMaterial>, transform: Transform) {
        self.parts.push(VisualPart {
            mesh,
            material,
            transform,
            spark: None,
            placeholder: false,
        });
    }
}

/// Small body circling a star visual
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Spark {
    pub radius: f32,
    pub speed: f32,
    pub phase: f32,
    pub tilt: f32,
}

impl Spark {
    pub fn offset(&self, elapsed: f32) -> Vec3 {
        let angle = self.phase + self.speed * elapsed;
        let flat = Vec3::new(angle.cos(), 0.0, angle.sin()) * self.radius;
        Quat::from_rotation_x(self.tilt) * flat
    }
}

/// Faint shell shown while the body is hovered or selected
#[derive(Component)]
pub struct HaloShell;

#[derive(Component)]
pub struct ModelPlaceholder;

/// External model still loading on this body
#[derive(Component)]
pub struct PendingModel {
    pub handle: Handle<Scene>,
    pub url: String,
}

pub fn animate_sparks(time: Res<Time>, mut sparks: Query<(&Spark, &mut Transform)>) {
    let elapsed = time.elapsed_secs();
    for (spark, mut transform) in sparks.iter_mut() {
        transform.translation = spark.offset(elapsed);
    }
}

/// Swap placeholders out once a model is ready; keep them if the load failed.
pub fn resolve_pending_models(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    pending: Query<(Entity, &PendingModel, &Children)>,
    placeholders: Query<(), With<ModelPlaceholder>>,
) {
    for (entity, model, children) in pending.iter() {
        match asset_server.load_state(model.handle.id()) {
            LoadState::Loaded => {
                for child in children.iter().filter(|c| placeholders.contains(*c)) {
                    commands.entity(child).despawn();
                }
                commands.entity(entity).remove::<PendingModel>();
                debug!("[SCENE] model ready: {}", model.url);
            }
            LoadState::Failed(err) => {
                warn!("[SCENE] model failed to load, keeping placeholder: {} ({})", model.url, err);
                commands.entity(entity).remove::<PendingModel>();
            }
            _ => {}
        }
    }
}

#[derive(SystemParam)]
pub struct VisualAssets<'w> {
    pub meshes: ResMut<'w, Assets<Mesh>>,
    pub materials: ResMut<'w, Assets<StandardMaterial>>,
    pub asset_server: Res<'w, AssetServer>,
}

impl VisualAssets<'_> {
    fn unlit(&mut self, color: Color) -> Handle<StandardMaterial> {
        let alpha_mode = if color.alpha() < 1.0 {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        };
        self.materials.add(StandardMaterial {
            base_color: color,
            unlit: true,
            alpha_mode,
            ..default()
        })
    }

    fn sphere(&mut self) -> Handle<Mesh> {
        self.meshes
            .add(Sphere::new(1.0).mesh().uv(24, 16))
    }

    fn wire_sphere(&mut self) -> Handle<Mesh> {
        let (points, edges) = icosphere_edges(WIRE_SUBDIVISIONS);
        self.meshes.add(line_mesh(&points, &edges))
    }

    fn pick_shell(&mut self, scale: f32) -> VisualPart {
        let material = self.materials.add(StandardMaterial {
            base_color: Color::NONE,
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        });
        VisualPart {
            mesh: self.meshes.add(Sphere::new(PICK_SHELL_RADIUS).mesh().uv(24, 16)),
            material,
            transform: Transform::from_scale(Vec3::splat(scale)),
            spark: None,
            placeholder: false,
        }
    }

    fn halo(&mut self, scale: f32, color: Color) -> VisualPart {
        let material = self.materials.add(StandardMaterial {
            base_color: color.with_alpha(0.12),
            alpha_mode: AlphaMode::Add,
            unlit: true,
            ..default()
        });
        VisualPart {
            mesh: self.meshes.add(Sphere::new(HALO_RADIUS).mesh().uv(24, 16)),
            material,
            transform: Transform::from_scale(Vec3::splat(scale)),
            spark: None,
            placeholder: false,
        }
    }

    /// Glowing core used for the central node.
    pub fn sun(&mut self, scale: f32, color: Color) -> VisualBuild {
        let core = self.materials.add(StandardMaterial {
            base_color: color,
            emissive: LinearRgba::from(color) * 4.0,
            ..default()
        });
        let sized = Transform::from_scale(Vec3::splat(scale));
        let mut build = VisualBuild::default();
        build.push(self.sphere(), core, sized);
        let wire = self.unlit(color.with_alpha(0.5));
        build.push(self.wire_sphere(), wire, sized.with_scale(Vec3::splat(scale * 1.15)));
        build.pick_shell = Some(self.pick_shell(scale));
        build.halo = Some(self.halo(scale, color));
        build
    }
}

/// Unit icosphere as unique vertices plus unique edges.
pub fn icosphere_edges(subdivisions: u32) -> (Vec<Vec3>, Vec<[u32; 2]>) {
    let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let mut vertices: Vec<Vec3> = [
        (-1.0, phi, 0.0),
        (1.0, phi, 0.0),
        (-1.0, -phi, 0.0),
        (1.0, -phi, 0.0),
        (0.0, -1.0, phi),
        (0.0, 1.0, phi),
        (0.0, -1.0, -phi),
        (0.0, 1.0, -phi),
        (phi, 0.0, -1.0),
        (phi, 0.0, 1.0),
        (-phi, 0.0, -1.0),
        (-phi, 0.0, 1.0),
    ]
    .into_iter()
    .map(|(x, y, z)| Vec3::new(x, y, z).normalize())
    .collect();

    let mut triangles: Vec<[u32; 3]> = vec![
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut cache: HashMap<(u32, u32), u32> = HashMap::new();
        let mut next = Vec::with_capacity(triangles.len() * 4);
        for [v1, v2, v3] in triangles {
            let a = midpoint(&mut vertices, &mut cache, v1, v2);
            let b = midpoint(&mut vertices, &mut cache, v2, v3);
            let c = midpoint(&mut vertices, &mut cache, v3, v1);
            next.extend_from_slice(&[[v1, a, c], [v2, b, a], [v3, c, b], [a, b, c]]);
        }
        triangles = next;
    }

    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for [a, b, c] in triangles {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            let key = (u.min(v), u.max(v));
            if seen.insert(key) {
                edges.push([key.0, key.1]);
            }
        }
    }
    (vertices, edges)
}

fn midpoint(vertices: &mut Vec<Vec3>, cache: &mut HashMap<(u32, u32), u32>, v1: u32, v2: u32) -> u32 {
    let key = (v1.min(v2), v1.max(v2));
    if let Some(&index) = cache.get(&key) {
        return index;
    }
    let mid = ((vertices[v1 as usize] + vertices[v2 as usize]) / 2.0).normalize();
    vertices.push(mid);
    let index = vertices.len() as u32 - 1;
    cache.insert(key, index);
    index
}

/// Evenly spread points on the unit sphere.
pub fn fibonacci_sphere(count: usize) -> Vec<Vec3> {
    if count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![Vec3::Y];
    }
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * i as f32 / (count - 1) as f32;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f32;
            Vec3::new(theta.cos() * ring, y, theta.sin() * ring)
        })
        .collect()
}

/// Connect every point to its `k` nearest neighbors, without duplicates.
pub fn nearest_neighbor_edges(points: &[Vec3], k: usize) -> Vec<[u32; 2]> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for (i, p) in points.iter().enumerate() {
        let mut others: Vec<(usize, f32)> = points
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, q)| (j, p.distance_squared(*q)))
            .collect();
        others.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (j, _) in others.into_iter().take(k) {
            let key = (i.min(j) as u32, i.max(j) as u32);
            if seen.insert(key) {
                edges.push([key.0, key.1]);
            }
        }
    }
    edges
}

pub fn line_mesh(points: &[Vec3], edges: &[[u32; 2]]) -> Mesh {
    let normals: Vec<Vec3> = points.iter().map(|p| p.normalize_or_zero()).collect();
    let indices: Vec<u32> = edges.iter().flat_map(|e| e.iter().copied()).collect();
    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, points.to_vec());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// One small octahedron per point, merged into a single triangle mesh.
pub fn dot_cloud_mesh(points: &[Vec3], radius: f32) -> Mesh {
    const CORNERS: [Vec3; 6] = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    const FACES: [[u32; 3]; 8] = [
        [0, 2, 4], [2, 1, 4], [1, 3, 4], [3, 0, 4],
        [2, 0, 5], [1, 2, 5], [3, 1, 5], [0, 3, 5],
    ];

    let mut positions = Vec::with_capacity(points.len() * CORNERS.len());
    let mut normals = Vec::with_capacity(points.len() * CORNERS.len());
    let mut indices = Vec::with_capacity(points.len() * FACES.len() * 3);
    for (n, center) in points.iter().enumerate() {
        let base = (n * CORNERS.len()) as u32;
        for corner in CORNERS {
            positions.push(*center + corner * radius);
            normals.push(corner);
        }
        for face in FACES {
            indices.extend(face.iter().map(|i| base + i));
        }
    }

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}
