use bevy::prelude::*;
use bevy::math::primitives::Circle;
use bevy::sprite::{MaterialMesh2dBundle, Mesh2dHandle};
use bevy::utils::HashMap;
use bevy::window::WindowResolution;

use crate::simulation::command::Command;
use crate::simulation::scenario::Scenario;
use crate::simulation::states::{BodyHandle, BodyView, Tint};

/// Entity drawing one body; respawned when the body's tint changes
#[derive(Component)]
struct BodySprite {
    handle: BodyHandle,
    tint: Tint,
}

/// Unit circle shared by every body sprite, scaled by the body radius
#[derive(Resource)]
struct UnitCircle(Mesh2dHandle);

pub fn run_2d(scenario: Scenario) {
    tracing::info!(bodies = scenario.runner.sim().len(), "starting Bevy 2D viewer");

    let window = Window {
        title: "collisim".into(),
        resolution: WindowResolution::new(scenario.arena.width as f32, scenario.arena.height as f32),
        ..Default::default()
    };

    App::new()
        .insert_resource(scenario)
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(window),
                    ..Default::default()
                })
                // tracing is already set up by main
                .disable::<bevy::log::LogPlugin>(),
        )
        .add_systems(Startup, setup_system)
        .add_systems(Update, (input_system, physics_step_system, sync_bodies_system).chain())
        .run();
}

fn setup_system(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    // 2D camera
    commands.spawn(Camera2dBundle::default());
    commands.insert_resource(UnitCircle(Mesh2dHandle(meshes.add(Circle::new(1.0)))));
}

/// Keyboard bindings: P spawn, G grid, Space pause, Comma / Period time scale
fn input_system(keys: Res<ButtonInput<KeyCode>>, mut scenario: ResMut<Scenario>) {
    let bindings = [
        (KeyCode::KeyP, Command::SpawnBodies { count: 100 }),
        (KeyCode::KeyG, Command::ToggleGrid),
        (KeyCode::Space, Command::TogglePause),
        (KeyCode::Comma, Command::AdjustTimeScale { delta: -1 }),
        (KeyCode::Period, Command::AdjustTimeScale { delta: 1 }),
    ];

    for (key, command) in bindings {
        if keys.just_pressed(key) {
            if let Err(e) = scenario.runner.apply(command) {
                tracing::warn!("{command:?} failed: {e}");
            }
        }
    }
}

fn physics_step_system(mut scenario: ResMut<Scenario>, time: Res<Time>) {
    scenario.runner.advance(time.delta_seconds() as f64);
}

fn sync_bodies_system(
    mut commands: Commands,
    scenario: Res<Scenario>,
    unit_circle: Res<UnitCircle>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut query: Query<(Entity, &BodySprite, &mut Transform)>,
) {
    let (w, h) = (scenario.arena.width as f32, scenario.arena.height as f32);
    // arena origin is top-left with y down; the 2D camera is centered with y up
    let to_screen = |view: &BodyView| Vec3::new(view.x.x as f32 - 0.5 * w, 0.5 * h - view.x.y as f32, 0.0);

    let mut live: HashMap<BodyHandle, BodyView> = scenario
        .runner
        .sim()
        .snapshot()
        .into_iter()
        .map(|v| (v.handle, v))
        .collect();

    for (entity, sprite, mut transform) in &mut query {
        let current = live.get(&sprite.handle).filter(|v| v.tint == sprite.tint).copied();
        match current {
            Some(view) => {
                transform.translation = to_screen(&view);
                transform.scale = Vec3::splat(view.radius as f32);
                live.remove(&sprite.handle);
            }
            None => commands.entity(entity).despawn(),
        }
    }

    for view in live.values() {
        let [r, g, b] = view.tint.0;
        commands.spawn((
            MaterialMesh2dBundle {
                mesh: unit_circle.0.clone(),
                material: materials.add(ColorMaterial::from(Color::srgb_u8(r, g, b))),
                transform: Transform::from_translation(to_screen(view)).with_scale(Vec3::splat(view.radius as f32)),
                ..Default::default()
            },
            BodySprite {
                handle: view.handle,
                tint: view.tint,
            },
        ));
    }
}
