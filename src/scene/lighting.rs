//! Fixed lighting rig

use bevy::light::GlobalAmbientLight;
use bevy::prelude::*;

/// Marker for the key directional light
#[derive(Component)]
pub struct KeyLight;

pub fn spawn_lighting(mut commands: Commands) {
    commands.insert_resource(GlobalAmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 6_000.0,
            ..default()
        },
        KeyLight,
        Transform::from_xyz(10.0, 15.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
        Name::new("Key Light"),
    ));

    let fills = [
        (Vec3::new(10.0, 10.0, 10.0), Color::WHITE, "Fill Light"),
        (
            Vec3::new(-10.0, -10.0, -10.0),
            Color::srgb_u8(0x7c, 0x3a, 0xed),
            "Violet Rim Light",
        ),
        (
            Vec3::new(0.0, 5.0, 5.0),
            Color::srgb_u8(0x06, 0xb6, 0xd4),
            "Cyan Rim Light",
        ),
    ];
    for (position, color, name) in fills {
        commands.spawn((
            PointLight {
                color,
                intensity: 400_000.0,
                range: 60.0,
                ..default()
            },
            Transform::from_translation(position),
            Name::new(name),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lighting_rig_spawns() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_systems(Startup, spawn_lighting);
        app.update();

        let world = app.world_mut();
        assert!(world.get_resource::<GlobalAmbientLight>().is_some());
        let keys = world.query_filtered::<(), With<KeyLight>>().iter(world).count();
        assert_eq!(keys, 1);
        let points = world.query::<&PointLight>().iter(world).count();
        assert_eq!(points, 3);
    }
}
