//! Cannon hits through the real Rapier pipeline.
//!
//! The app runs [`RapierPhysicsPlugin`] headless, so contacts, solver and
//! velocity write-back all happen as in the game.  A wood wall rests on a
//! fixed ground and a 20 kg ball is fired into it at 6 m/s: 120 damage
//! against 100 HP must break it.

use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use bevy::time::TimeUpdateStrategy;
use bevy::transform::TransformPlugin;
use bevy_rapier2d::prelude::*;
use siegeworks::cannon::{cannonball_bundle, ShotParam};
use siegeworks::catalog::{Material, StructureKind};
use siegeworks::config::DestructionConfig;
use siegeworks::phase::{GamePhase, StartAttack};
use siegeworks::placement::PlacementRequest;
use siegeworks::plugin::{DestructionPlugin, SolidLink, Support};
use siegeworks::solid::SolidId;
use siegeworks::world::DestructionWorld;
use std::time::Duration;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn physics_app() -> App {
    let config = DestructionConfig::default();
    let ppm = config.pixels_per_meter;

    let mut app = App::new();
    app.add_plugins((MinimalPlugins, StatesPlugin, TransformPlugin));
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(
        1.0 / 60.0,
    )));
    app.insert_resource(config);
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(ppm));
    app.add_plugins(DestructionPlugin {
        load_config_file: false,
    });
    app.update();

    app.world_mut().spawn((
        Support,
        Transform::from_xyz(0.0, -0.5 * ppm, 0.0),
        RigidBody::Fixed,
        Collider::cuboid(20.0 * ppm, 0.5 * ppm),
    ));
    app
}

fn wall_entity(app: &mut App) -> (Entity, SolidId) {
    let mut query = app.world_mut().query::<(Entity, &SolidLink)>();
    let found = query.iter(app.world()).next().map(|(e, link)| (e, link.0));
    found.expect("wall body spawned")
}

fn run(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn cannon_ball_breaks_wood_wall_through_rapier() {
    let mut app = physics_app();
    let ppm = app.world().resource::<DestructionConfig>().pixels_per_meter;

    app.world_mut().write_message(PlacementRequest::new(
        Material::Wood,
        StructureKind::Wall,
        Vec2::new(0.0, 1.5),
    ));
    run(&mut app, 2);
    let (entity, wall) = wall_entity(&mut app);

    app.world_mut().write_message(StartAttack);
    run(&mut app, 2);
    assert_eq!(
        *app.world().resource::<State<GamePhase>>().get(),
        GamePhase::Attack
    );

    // Let the wall settle; resting on static ground deals nothing.
    run(&mut app, 10);
    assert_eq!(
        app.world().resource::<DestructionWorld>().current_health(wall),
        Some(100.0)
    );

    let wall_pos = app
        .world()
        .get::<Transform>(entity)
        .expect("wall transform")
        .translation
        .truncate()
        / ppm;
    let shot = ShotParam {
        speed: 6.0,
        angle_deg: 180.0,
        delay: 0.0,
    };
    app.world_mut()
        .spawn(cannonball_bundle(wall_pos + Vec2::new(0.6, 0.0), &shot, ppm));

    let mut broke_at = None;
    for frame in 0..60 {
        app.update();
        if !app.world().resource::<DestructionWorld>().is_alive(wall) {
            broke_at = Some(frame);
            break;
        }
    }
    assert!(
        broke_at.is_some(),
        "wall survived with {:?} HP",
        app.world().resource::<DestructionWorld>().current_health(wall)
    );
    let debris = app
        .world()
        .resource::<DestructionWorld>()
        .alive_solids()
        .count();
    assert!(debris >= 2, "expected debris, found {debris}");
}
