//! Entities spawned by other entities, and the initial scheduling of any entity.

use rand::Rng;
use virtual_world_core::{Action, EntityHandle, EntityKind, ImageStore, Point};
use virtual_world_model::{Entity, World};
use virtual_world_system_scheduler::EventScheduler;

const BLOB_KEY: &str = "blob";
const BLOB_ID_SUFFIX: &str = " -- blob";
const BLOB_PERIOD_SCALE: u32 = 4;
const BLOB_ANIMATION_MIN: u32 = 50;
const BLOB_ANIMATION_MAX: u32 = 150;

const ORE_KEY: &str = "ore";
const ORE_ID_PREFIX: &str = "ore -- ";
const ORE_CORRUPT_MIN: u32 = 20_000;
const ORE_CORRUPT_MAX: u32 = 30_000;

const QUAKE_KEY: &str = "quake";
const QUAKE_ANIMATION_REPEAT_COUNT: u32 = 10;

/// Blob that replaces a corrupted ore at the same cell.
pub(crate) fn ore_blob<R, S>(ore: &Entity, position: Point, rng: &mut R, images: &S) -> Entity
where
    R: Rng,
    S: ImageStore,
{
    Entity::ore_blob(
        format!("{}{BLOB_ID_SUFFIX}", ore.id()),
        position,
        ore.action_period() / BLOB_PERIOD_SCALE,
        rng.gen_range(BLOB_ANIMATION_MIN..BLOB_ANIMATION_MAX),
        images.image_list(BLOB_KEY),
    )
}

/// Fresh ore seeded by `vein` into a neighbouring cell.
pub(crate) fn seeded_ore<R, S>(vein: &Entity, position: Point, rng: &mut R, images: &S) -> Entity
where
    R: Rng,
    S: ImageStore,
{
    Entity::ore(
        format!("{ORE_ID_PREFIX}{}", vein.id()),
        position,
        rng.gen_range(ORE_CORRUPT_MIN..ORE_CORRUPT_MAX),
        images.image_list(ORE_KEY),
    )
}

/// Quake left behind where a blob met a vein.
pub(crate) fn quake<S>(position: Point, images: &S) -> Entity
where
    S: ImageStore,
{
    Entity::quake(position, images.image_list(QUAKE_KEY))
}

/// Schedules the first activity and animation events of a newly placed entity.
///
/// Blacksmiths and obstacles are passive and never scheduled. Quakes animate
/// a fixed number of times; every other animating kind animates until its
/// events are cancelled.
pub fn schedule_actions(world: &World, scheduler: &mut EventScheduler, handle: EntityHandle) {
    let Some(entity) = world.entity(handle) else {
        return;
    };

    let repeat_count = match entity.kind() {
        EntityKind::Blacksmith | EntityKind::Obstacle => return,
        EntityKind::Ore | EntityKind::Vein => None,
        EntityKind::MinerFull | EntityKind::MinerNotFull | EntityKind::OreBlob => Some(0),
        EntityKind::Quake => Some(QUAKE_ANIMATION_REPEAT_COUNT),
    };

    let _ = scheduler.schedule_event(
        handle,
        Action::Activity { entity: handle },
        entity.action_period(),
    );

    if let (Some(repeat_count), Some(period)) = (repeat_count, entity.animation_period()) {
        let _ = scheduler.schedule_event(
            handle,
            Action::Animation {
                entity: handle,
                repeat_count,
            },
            period,
        );
    }
}
