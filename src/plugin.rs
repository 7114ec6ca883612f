//! Bevy / Rapier bridge for the destruction engine.
//!
//! The [`DestructionWorld`] resource is the source of truth for solids.  Each
//! frame this plugin:
//!
//! 1. copies Rapier poses back into the world,
//! 2. turns Rapier collision events into [`CollisionImpact`]s for solids and
//!    the goal, using each body's velocity from before the step that made
//!    the contact ([`PreStepVelocity`]),
//! 3. mirrors spawned/destroyed solids as Rapier bodies,
//! 4. keeps the build budget current and polls the win check.
//!
//! World units are metres; entity transforms and Rapier work in pixels
//! (`DestructionConfig::pixels_per_meter`).

use crate::config::{load_destruction_config, DestructionConfig};
use crate::gameflow::{
    arm_win_check, goal_color_system, poll_win_check, ContactSurface, Goal, GoalHit, GoalReport,
    WinCheck,
};
use crate::health::CollisionImpact;
use crate::phase::{start_attack_system, GamePhase, StartAttack};
use crate::placement::{BudgetTracker, MaterialSelection, PlacementRequest};
use crate::solid::{SolidEvent, SolidId, VisualMaterial};
use crate::world::{DestructionWorld, ImpactOutcome};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use std::collections::HashMap;

// ── Components & Resources ────────────────────────────────────────────────────

/// Links a Rapier body to its solid record.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidLink(pub SolidId);

/// Mass used when a non-solid body (cannon ball, goal) strikes something.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct ImpactMass(pub f32);

/// Ground or base the goal may rest on.
#[derive(Component, Debug, Default)]
pub struct Support;

/// Local-space convex outline (pixels) used for the collider and fill mesh.
#[derive(Component, Debug, Clone)]
pub struct SolidOutline(pub Vec<Vec2>);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidVisual(pub VisualMaterial);

/// Linear velocity (pixels/s) a body had before the latest physics step.
///
/// Rapier writes `Velocity` back after resolving contacts, so by the time a
/// `CollisionEvent::Started` is read the normal component is already gone.
/// Impacts are measured from this copy instead.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct PreStepVelocity(pub Vec2);

#[derive(Resource, Debug, Default)]
pub struct SolidEntities(pub HashMap<SolidId, Entity>);

// ── Impact resolution ─────────────────────────────────────────────────────────

type BodyKinematics = (
    Option<&'static PreStepVelocity>,
    Option<&'static Velocity>,
    Option<&'static ImpactMass>,
);

/// Describe `other` as seen from `me` at the moment of contact.
///
/// Solids report their own mass, bodies tagged with [`ImpactMass`] report
/// that, and everything else counts as a static contact.
fn contact_impact(
    me: Entity,
    other: Entity,
    world: &DestructionWorld,
    links: &Query<&SolidLink>,
    bodies: &Query<BodyKinematics>,
    ppm: f32,
) -> CollisionImpact {
    let velocity = |e: Entity| {
        bodies
            .get(e)
            .ok()
            .and_then(|(pre, v, _)| pre.map(|p| p.0).or(v.map(|v| v.linvel)))
            .unwrap_or(Vec2::ZERO)
    };
    let relative_velocity = (velocity(other) - velocity(me)) / ppm;

    let solid_mass = links
        .get(other)
        .ok()
        .and_then(|link| world.solid(link.0))
        .and_then(|s| s.mass());
    let tagged_mass = bodies.get(other).ok().and_then(|(_, _, m)| m.map(|m| m.0));
    match solid_mass.or(tagged_mass) {
        Some(mass) => CollisionImpact::with_body(mass, relative_velocity),
        None => CollisionImpact::static_contact(relative_velocity),
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Startup: build the world from the loaded config unless one was inserted.
pub fn init_destruction_world(
    mut commands: Commands,
    config: Res<DestructionConfig>,
    existing: Option<Res<DestructionWorld>>,
) {
    if existing.is_none() {
        commands.insert_resource(DestructionWorld::new(config.clone()));
    }
    commands.insert_resource(BudgetTracker::new(config.budget_max));
}

/// `PostUpdate`, before Rapier reads the world: remember the velocity each
/// body enters the step with.
pub fn record_pre_step_velocity(mut bodies: Query<(&Velocity, &mut PreStepVelocity)>) {
    for (velocity, mut pre) in bodies.iter_mut() {
        pre.0 = velocity.linvel;
    }
}

pub fn sync_solid_poses(
    mut world: ResMut<DestructionWorld>,
    config: Res<DestructionConfig>,
    bodies: Query<(&SolidLink, &Transform)>,
) {
    let ppm = config.pixels_per_meter;
    for (link, transform) in bodies.iter() {
        world.update_pose(
            link.0,
            (transform.translation.truncate() / ppm).extend(0.0),
            transform.rotation,
        );
    }
}

/// Apply structure and debris damage from Rapier contacts.
///
/// Both impacts of a pair are resolved before either is applied so a solid
/// broken by the first still counts as a body for the second.
pub fn structure_impact_system(
    mut collisions: MessageReader<CollisionEvent>,
    mut world: ResMut<DestructionWorld>,
    phase: Res<State<GamePhase>>,
    config: Res<DestructionConfig>,
    links: Query<&SolidLink>,
    bodies: Query<BodyKinematics>,
) {
    let ppm = config.pixels_per_meter;
    for event in collisions.read() {
        let (e1, e2) = match event {
            CollisionEvent::Started(e1, e2, _) => (*e1, *e2),
            CollisionEvent::Stopped(..) => continue,
        };

        let hits: Vec<(SolidId, CollisionImpact)> = [(e1, e2), (e2, e1)]
            .into_iter()
            .filter_map(|(me, other)| {
                let link = links.get(me).ok()?;
                Some((link.0, contact_impact(me, other, &world, &links, &bodies, ppm)))
            })
            .collect();

        for (id, impact) in hits {
            match world.apply_impact(id, &impact, phase.get()) {
                ImpactOutcome::Fragmented(report) => debug!(
                    "{:?} fragmented: {} pieces in {} attempts",
                    id,
                    report.fragments.len(),
                    report.attempts
                ),
                ImpactOutcome::Destroyed => debug!("{:?} destroyed", id),
                _ => {}
            }
        }
    }
}

/// Apply goal damage from Rapier contacts.
#[allow(clippy::too_many_arguments)]
pub fn goal_impact_system(
    mut collisions: MessageReader<CollisionEvent>,
    mut goals: Query<&mut Goal>,
    supports: Query<(), With<Support>>,
    world: Res<DestructionWorld>,
    phase: Res<State<GamePhase>>,
    config: Res<DestructionConfig>,
    links: Query<&SolidLink>,
    bodies: Query<BodyKinematics>,
) {
    let ppm = config.pixels_per_meter;
    for event in collisions.read() {
        let (e1, e2) = match event {
            CollisionEvent::Started(e1, e2, _) => (*e1, *e2),
            CollisionEvent::Stopped(..) => continue,
        };
        let (goal_entity, other) = if goals.contains(e1) {
            (e1, e2)
        } else if goals.contains(e2) {
            (e2, e1)
        } else {
            continue;
        };

        let placed_structure = links
            .get(other)
            .ok()
            .and_then(|link| world.solid(link.0))
            .is_some_and(|s| !s.is_fragment());
        let surface = if supports.contains(other) || placed_structure {
            ContactSurface::Support
        } else {
            ContactSurface::Other
        };
        let impact = contact_impact(goal_entity, other, &world, &links, &bodies, ppm);

        let Ok(mut goal) = goals.get_mut(goal_entity) else {
            continue;
        };
        match goal.on_contact(surface, &impact, phase.get()) {
            GoalHit::Landed => info!("Goal landed"),
            GoalHit::Damaged { damage, remaining } => {
                info!("Goal took {:.0} damage ({:.0} left)", damage, remaining)
            }
            GoalHit::Destroyed => warn!("Goal destroyed"),
            GoalHit::Ignored => {}
        }
    }
}

/// Spawn Rapier bodies for new solids and despawn destroyed ones.
pub fn mirror_solid_events(
    mut commands: Commands,
    mut world: ResMut<DestructionWorld>,
    mut entities: ResMut<SolidEntities>,
    config: Res<DestructionConfig>,
) {
    let ppm = config.pixels_per_meter;
    for event in world.drain_events() {
        match event {
            SolidEvent::Spawned(id) => {
                if let Some(entity) = spawn_solid_body(&mut commands, &mut world, id, ppm) {
                    entities.0.insert(id, entity);
                }
            }
            SolidEvent::Destroyed(id) => {
                if let Some(entity) = entities.0.remove(&id) {
                    commands.entity(entity).despawn();
                }
            }
        }
    }
}

/// Build the Rapier body for one solid.  Returns `None` if the solid has no
/// body any more.
pub fn spawn_solid_body(
    commands: &mut Commands,
    world: &mut DestructionWorld,
    id: SolidId,
    ppm: f32,
) -> Option<Entity> {
    let impulse = world.take_pending_impulse(id).unwrap_or(Vec2::ZERO);
    let solid = world.solid(id)?;
    let body = solid.body.as_ref()?;

    let scaled = body
        .mesh
        .transformed(&Transform::from_scale(body.transform.scale));
    let outline: Vec<Vec2> = scaled
        .outline_2d()
        .unwrap_or_default()
        .into_iter()
        .map(|p| p * ppm)
        .collect();
    let collider = Collider::convex_hull(&outline).unwrap_or_else(|| {
        warn!("{}: convex hull failed; using ball collider", solid.name);
        let radius = outline.iter().map(|p| p.length()).fold(0.0_f32, f32::max);
        Collider::ball(radius.max(1.0))
    });

    let locked_axes = if body.rigid_body.constraints.locks_planar_rotation() {
        LockedAxes::ROTATION_LOCKED
    } else {
        LockedAxes::empty()
    };

    let entity = commands
        .spawn((
            Name::new(solid.name.clone()),
            SolidLink(id),
            SolidOutline(outline),
            SolidVisual(body.visual),
            Transform {
                translation: (body.transform.translation.truncate() * ppm).extend(0.0),
                rotation: body.transform.rotation,
                scale: Vec3::ONE,
            },
            RigidBody::Dynamic,
            collider,
            ColliderMassProperties::Mass(body.rigid_body.mass),
            Damping {
                linear_damping: body.rigid_body.drag,
                angular_damping: body.rigid_body.angular_damping,
            },
            locked_axes,
            Velocity::zero(),
            PreStepVelocity::default(),
            ExternalImpulse {
                impulse: impulse * ppm,
                torque_impulse: 0.0,
            },
            ActiveEvents::COLLISION_EVENTS,
        ))
        .id();
    Some(entity)
}

/// Handle placement requests while building, refusing any that would exceed
/// the budget.
pub fn place_structure_system(
    mut requests: MessageReader<PlacementRequest>,
    mut world: ResMut<DestructionWorld>,
    budget: Res<BudgetTracker>,
) {
    // Running total for this frame; the resource catches up in `budget_system`.
    let mut spent = budget.clone();
    for request in requests.read() {
        let Some(cost) = world.cost(request.material, request.kind) else {
            warn!(
                "No catalog entry for {} {}",
                request.material.label(),
                request.kind.label()
            );
            continue;
        };
        if !spent.can_afford(cost) {
            info!(
                "Placement of {} {} refused: costs {:.0}, {:.0} left",
                request.material.label(),
                request.kind.label(),
                cost,
                spent.remaining()
            );
            continue;
        }
        match world.place_structure(request) {
            Ok(_) => spent.current += cost,
            Err(e) => warn!("Placement failed: {}", e),
        }
    }
}

/// `OnEnter(Attack)`: the goal is held in place while building and falls
/// freely once the attack starts.
pub fn release_goal_system(mut goals: Query<&mut RigidBody, With<Goal>>) {
    for mut body in goals.iter_mut() {
        *body = RigidBody::Dynamic;
    }
}

pub fn budget_system(world: Res<DestructionWorld>, mut budget: ResMut<BudgetTracker>) {
    let was_exceeded = budget.is_exceeded();
    let catalog = &world.config().catalog;
    budget.recompute(catalog, world.placed_structures());
    if budget.is_exceeded() && !was_exceeded {
        warn!(
            "Build budget exceeded: {:.0} / {:.0}",
            budget.current, budget.max
        );
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct DestructionPlugin {
    /// Read `assets/destruction.toml` at startup.
    pub load_config_file: bool,
}

impl Default for DestructionPlugin {
    fn default() -> Self {
        Self {
            load_config_file: true,
        }
    }
}

impl Plugin for DestructionPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<DestructionConfig>() {
            app.insert_resource(DestructionConfig::default());
        }
        if self.load_config_file {
            app.add_systems(
                Startup,
                load_destruction_config.before(init_destruction_world),
            );
        }

        // Registered by Rapier too; repeated registration is a no-op.
        app.add_message::<CollisionEvent>();

        app.init_state::<GamePhase>()
            .add_message::<StartAttack>()
            .add_message::<PlacementRequest>()
            .add_message::<GoalReport>()
            .init_resource::<SolidEntities>()
            .init_resource::<WinCheck>()
            .init_resource::<MaterialSelection>()
            .add_systems(Startup, init_destruction_world)
            .add_systems(
                PostUpdate,
                record_pre_step_velocity.before(PhysicsSet::SyncBackend),
            )
            .add_systems(
                OnEnter(GamePhase::Attack),
                (arm_win_check, release_goal_system),
            )
            .add_systems(
                Update,
                (
                    start_attack_system,
                    place_structure_system.run_if(in_state(GamePhase::Build)),
                    sync_solid_poses,
                    structure_impact_system,
                    goal_impact_system,
                    mirror_solid_events,
                    budget_system.run_if(in_state(GamePhase::Build)),
                    poll_win_check.run_if(in_state(GamePhase::Attack)),
                    goal_color_system,
                )
                    .chain(),
            );
    }
}
