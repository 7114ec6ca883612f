use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier2d::prelude::*;
use siegeworks::cannon::{Cannon, CannonPlugin, ShotParam};
use siegeworks::catalog::{Material, StructureKind};
use siegeworks::config::{read_config_file, DestructionConfig, CONFIG_PATH};
use siegeworks::constants::GOAL_MASS;
use siegeworks::gameflow::{GameOutcome, Goal, GoalReport};
use siegeworks::phase::{GamePhase, StartAttack};
use siegeworks::placement::{MaterialSelection, PlacementRequest};
use siegeworks::plugin::{
    init_destruction_world, DestructionPlugin, ImpactMass, PreStepVelocity, Support,
};
use siegeworks::solid_rendering::DestructionRenderPlugin;

/// Ground slab: top surface at y = 0 m.
const GROUND_SIZE: Vec2 = Vec2::new(40.0, 1.0);
const GOAL_SIZE: f32 = 1.0;

fn setup_camera(mut commands: Commands, config: Res<DestructionConfig>) {
    commands.spawn((
        Camera2d,
        Transform::from_xyz(2.0 * config.pixels_per_meter, 4.0 * config.pixels_per_meter, 0.0),
    ));
}

/// Ground, the starting fort, the goal on top and the cannon facing it.
fn spawn_arena(
    mut commands: Commands,
    config: Res<DestructionConfig>,
    mut placements: MessageWriter<PlacementRequest>,
) {
    let ppm = config.pixels_per_meter;

    commands.spawn((
        Name::new("Ground"),
        Support,
        Sprite::from_color(Color::srgb(0.30, 0.45, 0.22), GROUND_SIZE * ppm),
        Transform::from_xyz(0.0, -GROUND_SIZE.y * 0.5 * ppm, 0.0),
        RigidBody::Fixed,
        Collider::cuboid(GROUND_SIZE.x * 0.5 * ppm, GROUND_SIZE.y * 0.5 * ppm),
    ));

    placements.write_batch([
        PlacementRequest::new(Material::Wood, StructureKind::Wall, Vec2::new(6.0, 1.5)),
        PlacementRequest::new(Material::Wood, StructureKind::Wall, Vec2::new(8.0, 1.5)),
        PlacementRequest::new(Material::Wood, StructureKind::Slab, Vec2::new(7.0, 3.25)),
        PlacementRequest::new(Material::Stone, StructureKind::Square, Vec2::new(3.5, 0.75)),
        PlacementRequest::new(Material::Stone, StructureKind::RightTriangle, Vec2::new(1.5, 0.75)),
    ]);

    let goal = Goal::new(config.goal_max_health);
    commands.spawn((
        Name::new("Goal"),
        Sprite::from_color(goal.status_color(), Vec2::splat(GOAL_SIZE * ppm)),
        goal,
        ImpactMass(GOAL_MASS),
        Transform::from_xyz(7.0 * ppm, (3.5 + GOAL_SIZE * 0.5) * ppm, 0.0),
        // Held in place until the attack begins.
        RigidBody::KinematicPositionBased,
        Collider::cuboid(GOAL_SIZE * 0.5 * ppm, GOAL_SIZE * 0.5 * ppm),
        ColliderMassProperties::Mass(GOAL_MASS),
        Velocity::zero(),
        PreStepVelocity::default(),
        ActiveEvents::COLLISION_EVENTS,
    ));

    let shots = vec![
        ShotParam { speed: 18.0, angle_deg: 20.0, delay: 0.0 },
        ShotParam { speed: 20.0, angle_deg: 15.0, delay: 1.5 },
        ShotParam { speed: 22.0, angle_deg: 25.0, delay: 1.5 },
        ShotParam { speed: 16.0, angle_deg: 35.0, delay: 2.0 },
    ];
    commands.spawn((Name::new("Cannon"), Cannon::new(Vec2::new(-12.0, 1.0), shots)));
}

/// Build-phase controls: `1`/`2` pick wood or stone, `Q`/`W`/`E`/`R` place a
/// wall, square, slab or triangle at the cursor, `Enter` starts the attack.
fn build_input_system(
    keys: Res<ButtonInput<KeyCode>>,
    mut selection: ResMut<MaterialSelection>,
    windows: Query<&Window>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    config: Res<DestructionConfig>,
    mut placements: MessageWriter<PlacementRequest>,
    mut start: MessageWriter<StartAttack>,
) {
    if keys.just_pressed(KeyCode::Digit1) {
        selection.0 = Material::Wood;
    }
    if keys.just_pressed(KeyCode::Digit2) {
        selection.0 = Material::Stone;
    }
    if keys.just_pressed(KeyCode::Enter) {
        start.write(StartAttack);
        return;
    }

    let kind = [
        (KeyCode::KeyQ, StructureKind::Wall),
        (KeyCode::KeyW, StructureKind::Square),
        (KeyCode::KeyE, StructureKind::Slab),
        (KeyCode::KeyR, StructureKind::RightTriangle),
    ]
    .into_iter()
    .find(|(key, _)| keys.just_pressed(*key))
    .map(|(_, kind)| kind);
    let Some(kind) = kind else {
        return;
    };

    let Ok(window) = windows.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = cameras.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok(world_pos) = camera.viewport_to_world_2d(camera_transform, cursor) else {
        return;
    };
    placements.write(PlacementRequest::with_selection(
        *selection,
        kind,
        world_pos / config.pixels_per_meter,
    ));
}

fn announce_outcome(mut reports: MessageReader<GoalReport>) {
    for report in reports.read() {
        match report.outcome {
            GameOutcome::Won => println!("The goal survived the siege. You win!"),
            GameOutcome::Lost => println!("The goal was destroyed. You lose."),
            GameOutcome::Pending => {}
        }
    }
}

fn main() {
    // Read the config before building the app so Rapier's pixel scale matches it.
    let config = read_config_file(CONFIG_PATH).unwrap_or_default();
    let ppm = config.pixels_per_meter;

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Siegeworks".into(),
                resolution: WindowResolution::new(1200, 680),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.62, 0.78, 0.92)))
        .insert_resource(config)
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(ppm))
        .add_plugins((
            DestructionPlugin {
                load_config_file: false,
            },
            DestructionRenderPlugin,
            CannonPlugin,
        ))
        .add_systems(
            Startup,
            (setup_camera, spawn_arena.after(init_destruction_world)),
        )
        .add_systems(
            Update,
            (
                build_input_system.run_if(in_state(GamePhase::Build)),
                announce_outcome,
            ),
        )
        .run();
}
