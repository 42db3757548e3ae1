#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-kind entity behavior for the virtual world.
//!
//! Every scheduled action lands here. Activity actions run the kind-specific
//! state machine of their entity, which reads and mutates the [`World`] and
//! schedules follow-up events; animation actions advance an entity's frame
//! index and keep the animation going while repeats remain.

mod activity;
mod spawn;

use rand::Rng;
use tracing::debug;
use virtual_world_core::{Action, EntityHandle, ImageStore};
use virtual_world_model::World;
use virtual_world_system_scheduler::{Dispatch, EventScheduler};

pub use spawn::schedule_actions;

/// Owns the world, the scheduler and the collaborators handlers need.
#[derive(Debug)]
pub struct Simulation<R, S> {
    world: World,
    scheduler: EventScheduler,
    rng: R,
    images: S,
}

impl<R, S> Simulation<R, S>
where
    R: Rng,
    S: ImageStore,
{
    /// Assembles a simulation from its collaborators.
    #[must_use]
    pub fn new(world: World, scheduler: EventScheduler, rng: R, images: S) -> Self {
        Self {
            world,
            scheduler,
            rng,
            images,
        }
    }

    /// Schedules the initial actions of every live entity.
    pub fn schedule_all_actions(&mut self) {
        let handles: Vec<EntityHandle> = self.world.entities().map(|(handle, _)| handle).collect();
        for handle in handles {
            schedule_actions(&self.world, &mut self.scheduler, handle);
        }
    }

    /// Dispatches every event due before `now` and returns how many ran.
    pub fn advance(&mut self, now: u64) -> usize {
        let Self {
            world,
            scheduler,
            rng,
            images,
        } = self;
        let mut context = Context {
            world,
            rng,
            images,
        };
        scheduler.advance(now, &mut context)
    }

    /// Read-only access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read-only access to the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }
}

/// Borrowed collaborators handed to every handler during a drain.
pub(crate) struct Context<'a, R, S> {
    pub(crate) world: &'a mut World,
    pub(crate) rng: &'a mut R,
    pub(crate) images: &'a S,
}

impl<R, S> Dispatch for Context<'_, R, S>
where
    R: Rng,
    S: ImageStore,
{
    fn dispatch(&mut self, scheduler: &mut EventScheduler, action: Action) {
        match action {
            Action::Activity { entity } => activity::execute(self, scheduler, entity),
            Action::Animation {
                entity,
                repeat_count,
            } => execute_animation(self.world, scheduler, entity, repeat_count),
        }
    }
}

/// Advances the entity's frame and reschedules while repeats remain.
///
/// A `repeat_count` of `0` animates until the entity's events are cancelled;
/// `N > 0` runs exactly `N` frames counting this one.
pub fn execute_animation(
    world: &mut World,
    scheduler: &mut EventScheduler,
    entity: EntityHandle,
    repeat_count: u32,
) {
    let Some(record) = world.entity_mut(entity) else {
        debug!(entity = entity.get(), "animation for entity no longer in the world");
        return;
    };
    record.next_image();
    if repeat_count == 1 {
        return;
    }

    let Some(period) = record.animation_period() else {
        unreachable!("animation scheduled for non-animating {:?}", record.kind());
    };
    let _ = scheduler.schedule_event(
        entity,
        Action::Animation {
            entity,
            repeat_count: repeat_count.saturating_sub(1),
        },
        period,
    );
}
