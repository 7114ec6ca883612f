//! The attacking cannon: a scripted volley of shots fired once the attack
//! phase begins.
//!
//! The first shot leaves as soon as the volley starts; each later shot waits
//! for its own `delay` after the previous one.

use crate::config::DestructionConfig;
use crate::constants::{CANNONBALL_LIFETIME_SECS, CANNONBALL_MASS, CANNONBALL_RADIUS};
use crate::phase::GamePhase;
use crate::plugin::{ImpactMass, PreStepVelocity};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ShotParam {
    /// Muzzle speed (m/s).
    pub speed: f32,
    /// Degrees above horizontal; 90 is straight up.
    pub angle_deg: f32,
    /// Seconds to wait after the previous shot.  Ignored for the first shot.
    pub delay: f32,
}

impl ShotParam {
    pub fn initial_velocity(&self) -> Vec2 {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        Vec2::new(cos, sin) * self.speed
    }
}

#[derive(Component, Debug, Clone)]
pub struct Cannon {
    /// Muzzle position in metres.
    pub muzzle: Vec2,
    pub shots: Vec<ShotParam>,
    next: usize,
    countdown: Option<f32>,
}

impl Cannon {
    pub fn new(muzzle: Vec2, shots: Vec<ShotParam>) -> Self {
        Self {
            muzzle,
            shots,
            next: 0,
            countdown: None,
        }
    }

    /// Fire the opening shot.  Does nothing once the volley has begun.
    pub fn start(&mut self) -> Option<ShotParam> {
        if self.next != 0 {
            return None;
        }
        self.fire_next()
    }

    /// Advance the countdown by `dt` seconds and return every shot due.
    pub fn tick(&mut self, dt: f32) -> Vec<ShotParam> {
        let mut due = Vec::new();
        let Some(mut remaining) = self.countdown else {
            return due;
        };
        remaining -= dt;
        while remaining <= 0.0 {
            let Some(shot) = self.fire_next() else {
                return due;
            };
            due.push(shot);
            match self.countdown {
                Some(delay) => remaining += delay,
                None => return due,
            }
        }
        self.countdown = Some(remaining);
        due
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.shots.len()
    }

    fn fire_next(&mut self) -> Option<ShotParam> {
        let shot = *self.shots.get(self.next)?;
        self.next += 1;
        self.countdown = self.shots.get(self.next).map(|s| s.delay);
        Some(shot)
    }
}

#[derive(Component, Debug, Default)]
pub struct Cannonball {
    pub age: f32,
}

/// Components of one physical cannon ball leaving `muzzle` (metres).
pub fn cannonball_bundle(muzzle: Vec2, shot: &ShotParam, ppm: f32) -> impl Bundle {
    let velocity = shot.initial_velocity() * ppm;
    (
        Name::new("Cannonball"),
        Cannonball::default(),
        ImpactMass(CANNONBALL_MASS),
        Transform::from_translation((muzzle * ppm).extend(0.0)),
        RigidBody::Dynamic,
        Collider::ball(CANNONBALL_RADIUS * ppm),
        ColliderMassProperties::Mass(CANNONBALL_MASS),
        Velocity::linear(velocity),
        PreStepVelocity(velocity),
        Ccd::enabled(),
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// Spawn one physical cannon ball.  Visuals are attached by the render plugin.
pub fn spawn_cannonball(commands: &mut Commands, muzzle: Vec2, shot: &ShotParam, ppm: f32) -> Entity {
    commands.spawn(cannonball_bundle(muzzle, shot, ppm)).id()
}

/// `OnEnter(Attack)`: open every cannon's volley.
pub fn start_volley_system(
    mut commands: Commands,
    mut cannons: Query<&mut Cannon>,
    config: Res<DestructionConfig>,
) {
    for mut cannon in cannons.iter_mut() {
        if let Some(shot) = cannon.start() {
            info!("Cannon volley started: {} shots", cannon.shots.len());
            spawn_cannonball(&mut commands, cannon.muzzle, &shot, config.pixels_per_meter);
        }
    }
}

pub fn cannon_fire_system(
    mut commands: Commands,
    time: Res<Time>,
    mut cannons: Query<&mut Cannon>,
    config: Res<DestructionConfig>,
) {
    let dt = time.delta_secs();
    for mut cannon in cannons.iter_mut() {
        if cannon.is_finished() {
            continue;
        }
        let muzzle = cannon.muzzle;
        for shot in cannon.tick(dt) {
            spawn_cannonball(&mut commands, muzzle, &shot, config.pixels_per_meter);
        }
        if cannon.is_finished() {
            info!("Cannon volley finished");
        }
    }
}

pub fn cannonball_lifetime_system(
    mut commands: Commands,
    time: Res<Time>,
    mut balls: Query<(Entity, &mut Cannonball)>,
) {
    let dt = time.delta_secs();
    for (entity, mut ball) in balls.iter_mut() {
        ball.age += dt;
        if ball.age >= CANNONBALL_LIFETIME_SECS {
            commands.entity(entity).despawn();
        }
    }
}

pub struct CannonPlugin;

impl Plugin for CannonPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GamePhase::Attack), start_volley_system)
            .add_systems(
                Update,
                (cannon_fire_system, cannonball_lifetime_system)
                    .run_if(in_state(GamePhase::Attack)),
            );
    }
}
