//! Kind-specific activity handlers.

use rand::Rng;
use tracing::debug;
use virtual_world_core::{next_step_toward, Action, EntityHandle, EntityKind, ImageStore, Point};
use virtual_world_model::{Entity, World};
use virtual_world_system_scheduler::EventScheduler;

use crate::{spawn, Context};

/// Cells a mover may step onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Passability {
    /// Only free cells.
    Unoccupied,
    /// Free cells and cells holding ore, which the mover tramples.
    UnoccupiedOrOre,
}

impl Passability {
    fn allows(self, world: &World, cell: Point) -> bool {
        match (self, world.occupant_kind(cell)) {
            (_, None) => true,
            (Self::UnoccupiedOrOre, Some(EntityKind::Ore)) => true,
            _ => false,
        }
    }
}

pub(crate) fn execute<R, S>(
    context: &mut Context<'_, R, S>,
    scheduler: &mut EventScheduler,
    handle: EntityHandle,
)
where
    R: Rng,
    S: ImageStore,
{
    let Some(kind) = context.world.entity(handle).map(Entity::kind) else {
        debug!(entity = handle.get(), "activity for entity no longer in the world");
        return;
    };

    match kind {
        EntityKind::MinerFull => miner_full(context, scheduler, handle),
        EntityKind::MinerNotFull => miner_not_full(context, scheduler, handle),
        EntityKind::Ore => ore(context, scheduler, handle),
        EntityKind::OreBlob => ore_blob(context, scheduler, handle),
        EntityKind::Quake => quake(context.world, scheduler, handle),
        EntityKind::Vein => vein(context, scheduler, handle),
        EntityKind::Blacksmith | EntityKind::Obstacle => {
            unreachable!("activity dispatched for passive {kind:?}")
        }
    }
}

fn miner_not_full<R, S>(
    context: &mut Context<'_, R, S>,
    scheduler: &mut EventScheduler,
    handle: EntityHandle,
)
where
    R: Rng,
    S: ImageStore,
{
    let world = &mut *context.world;
    let Some(miner) = world.entity(handle) else {
        return;
    };
    let (position, action_period) = (miner.position(), miner.action_period());

    let mut transformed = false;
    if let Some((ore, ore_position)) = nearest(world, position, EntityKind::Ore) {
        if approach(world, scheduler, handle, ore_position, Passability::Unoccupied) {
            let _ = world.remove_entity(ore);
            let _ = scheduler.unschedule_all_events(ore);
            if let Some(miner) = world.entity_mut(handle) {
                miner.gather();
            }
            debug!(miner = handle.get(), ore = ore.get(), "ore mined");
            transformed = transform_when_full(world, scheduler, handle);
        }
    }

    if !transformed {
        reschedule(scheduler, handle, action_period);
    }
}

fn transform_when_full(
    world: &mut World,
    scheduler: &mut EventScheduler,
    handle: EntityHandle,
) -> bool {
    if !world.entity(handle).is_some_and(Entity::is_full) {
        return false;
    }
    replace(world, scheduler, handle, Entity::to_miner_full);
    true
}

fn miner_full<R, S>(
    context: &mut Context<'_, R, S>,
    scheduler: &mut EventScheduler,
    handle: EntityHandle,
)
where
    R: Rng,
    S: ImageStore,
{
    let world = &mut *context.world;
    let Some(miner) = world.entity(handle) else {
        return;
    };
    let (position, action_period) = (miner.position(), miner.action_period());

    let at_smith = nearest(world, position, EntityKind::Blacksmith).is_some_and(
        |(_, smith_position)| {
            approach(world, scheduler, handle, smith_position, Passability::Unoccupied)
        },
    );

    if at_smith {
        replace(world, scheduler, handle, Entity::to_miner_not_full);
    } else {
        reschedule(scheduler, handle, action_period);
    }
}

fn ore<R, S>(
    context: &mut Context<'_, R, S>,
    scheduler: &mut EventScheduler,
    handle: EntityHandle,
)
where
    R: Rng,
    S: ImageStore,
{
    let Some(position) = context.world.entity(handle).map(Entity::position) else {
        return;
    };
    let Some(ore) = context.world.remove_entity(handle) else {
        return;
    };

    let blob = spawn::ore_blob(&ore, position, context.rng, context.images);
    if let Some(blob) = context.world.add_entity(blob) {
        debug!(ore = handle.get(), blob = blob.get(), %position, "ore corrupted into blob");
        spawn::schedule_actions(context.world, scheduler, blob);
    }
}

fn ore_blob<R, S>(
    context: &mut Context<'_, R, S>,
    scheduler: &mut EventScheduler,
    handle: EntityHandle,
)
where
    R: Rng,
    S: ImageStore,
{
    let world = &mut *context.world;
    let Some(blob) = world.entity(handle) else {
        return;
    };
    let (position, action_period) = (blob.position(), blob.action_period());
    let mut next_period = action_period;

    if let Some((vein, vein_position)) = nearest(world, position, EntityKind::Vein) {
        if approach(world, scheduler, handle, vein_position, Passability::UnoccupiedOrOre) {
            let _ = world.remove_entity(vein);
            let _ = scheduler.unschedule_all_events(vein);

            let quake = spawn::quake(vein_position, context.images);
            if let Some(quake) = world.add_entity(quake) {
                debug!(
                    blob = handle.get(),
                    quake = quake.get(),
                    position = %vein_position,
                    "blob struck vein"
                );
                spawn::schedule_actions(world, scheduler, quake);
            }
            next_period = next_period.saturating_add(action_period);
        }
    }

    reschedule(scheduler, handle, next_period);
}

fn quake(world: &mut World, scheduler: &mut EventScheduler, handle: EntityHandle) {
    let _ = scheduler.unschedule_all_events(handle);
    let _ = world.remove_entity(handle);
}

fn vein<R, S>(
    context: &mut Context<'_, R, S>,
    scheduler: &mut EventScheduler,
    handle: EntityHandle,
)
where
    R: Rng,
    S: ImageStore,
{
    let Some(vein) = context.world.entity(handle) else {
        return;
    };
    let action_period = vein.action_period();

    if let Some(open) = context.world.find_open_around(vein.position()) {
        let ore = spawn::seeded_ore(vein, open, context.rng, context.images);
        if let Some(ore) = context.world.add_entity(ore) {
            debug!(vein = handle.get(), ore = ore.get(), position = %open, "vein seeded ore");
            spawn::schedule_actions(context.world, scheduler, ore);
        }
    }

    reschedule(scheduler, handle, action_period);
}

fn nearest(world: &World, position: Point, kind: EntityKind) -> Option<(EntityHandle, Point)> {
    let handle = world.find_nearest(position, kind)?;
    let target = world.entity(handle)?.position();
    Some((handle, target))
}

/// Steps the mover toward `target` unless it is already adjacent.
///
/// Returns `true` only when the mover started the turn adjacent to the
/// target. An occupant evicted by a committed step loses its events.
fn approach(
    world: &mut World,
    scheduler: &mut EventScheduler,
    mover: EntityHandle,
    target: Point,
    passability: Passability,
) -> bool {
    let Some(from) = world.entity(mover).map(Entity::position) else {
        return false;
    };
    if from.adjacent(target) {
        return true;
    }

    let view: &World = world;
    let next = next_step_toward(from, target, |cell| passability.allows(view, cell));
    if next != from {
        if let Some(evicted) = world.move_entity(mover, next) {
            let _ = scheduler.unschedule_all_events(evicted);
            debug!(
                mover = mover.get(),
                evicted = evicted.get(),
                position = %next,
                "occupant trampled"
            );
        }
    }
    false
}

fn replace<F>(
    world: &mut World,
    scheduler: &mut EventScheduler,
    handle: EntityHandle,
    replacement: F,
)
where
    F: FnOnce(&Entity) -> Entity,
{
    let _ = scheduler.unschedule_all_events(handle);
    if let Some(replaced) = world.transform(handle, replacement) {
        debug!(from = handle.get(), to = replaced.get(), "miner transformed");
        spawn::schedule_actions(world, scheduler, replaced);
    }
}

fn reschedule(scheduler: &mut EventScheduler, handle: EntityHandle, period: u32) {
    let _ = scheduler.schedule_event(handle, Action::Activity { entity: handle }, period);
}
