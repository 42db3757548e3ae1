#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Discrete-event scheduler that drives the virtual world.
//!
//! Pending events are kept in a time-ordered map alongside a per-entity
//! index so that every event owned by an entity can be cancelled at once.
//! The scheduler never reads a clock: drivers hand it the current time
//! through [`EventScheduler::advance`], and events are stamped relative to
//! the simulated instant at which they are scheduled.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::trace;
use virtual_world_core::{Action, EntityHandle};

/// Shortest delay between scheduling an event and its firing.
///
/// A zero delay would let a handler that reschedules itself stay due forever
/// inside a single [`EventScheduler::advance`].
pub const MIN_DELAY: u64 = 1;

/// Configuration parameters required to construct the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    time_scale: f64,
}

impl Config {
    /// Creates a configuration that multiplies every period by `time_scale`.
    ///
    /// Use [`Config::is_valid_time_scale`] to vet untrusted input; a scale
    /// that is not positive and finite collapses every period to
    /// [`MIN_DELAY`].
    #[must_use]
    pub const fn new(time_scale: f64) -> Self {
        Self { time_scale }
    }

    /// Reports whether `time_scale` is finite and strictly positive.
    #[must_use]
    pub fn is_valid_time_scale(time_scale: f64) -> bool {
        time_scale.is_finite() && time_scale > 0.0
    }

    /// Multiplier applied to every scheduled period.
    #[must_use]
    pub const fn time_scale(&self) -> f64 {
        self.time_scale
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Receives each due action popped by [`EventScheduler::advance`].
///
/// The scheduler is handed back so handlers can schedule follow-up events
/// or cancel pending ones.
pub trait Dispatch {
    /// Executes a single due action.
    fn dispatch(&mut self, scheduler: &mut EventScheduler, action: Action);
}

impl<F> Dispatch for F
where
    F: FnMut(&mut EventScheduler, Action),
{
    fn dispatch(&mut self, scheduler: &mut EventScheduler, action: Action) {
        self(scheduler, action);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct EventKey {
    fire_time: u64,
    sequence: u64,
}

/// Time-ordered queue of pending actions with per-entity cancellation.
#[derive(Debug)]
pub struct EventScheduler {
    queue: BTreeMap<EventKey, Action>,
    pending: HashMap<EntityHandle, BTreeSet<EventKey>>,
    time_scale: f64,
    current_time: u64,
    next_sequence: u64,
}

impl EventScheduler {
    /// Creates an empty scheduler positioned at time zero.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            queue: BTreeMap::new(),
            pending: HashMap::new(),
            time_scale: config.time_scale(),
            current_time: 0,
            next_sequence: 0,
        }
    }

    /// Simulated instant that new events are scheduled relative to.
    #[must_use]
    pub const fn current_time(&self) -> u64 {
        self.current_time
    }

    /// Moves the scheduling base forward to `now`. Earlier times are ignored.
    pub fn set_current_time(&mut self, now: u64) {
        self.current_time = self.current_time.max(now);
    }

    /// Multiplier applied to every scheduled period.
    #[must_use]
    pub const fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Schedules `action` for `entity` after `period` ticks and returns its fire time.
    ///
    /// The scaled period is truncated to whole ticks and raised to
    /// [`MIN_DELAY`] when it would otherwise be zero.
    pub fn schedule_event(&mut self, entity: EntityHandle, action: Action, period: u32) -> u64 {
        debug_assert_eq!(action.entity(), entity, "actions are owned by their target");

        let fire_time = self.current_time.saturating_add(self.scaled(period));
        let key = EventKey {
            fire_time,
            sequence: self.next_sequence,
        };
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let _ = self.queue.insert(key, action);
        let _ = self.pending.entry(entity).or_default().insert(key);
        fire_time
    }

    /// Cancels every pending event owned by `entity` and returns how many were dropped.
    pub fn unschedule_all_events(&mut self, entity: EntityHandle) -> usize {
        let Some(keys) = self.pending.remove(&entity) else {
            return 0;
        };
        for key in &keys {
            let _ = self.queue.remove(key);
        }
        keys.len()
    }

    /// Dispatches, in fire-time order, every event due strictly before `now`.
    ///
    /// Events scheduled by the dispatcher that also fall before `now` are
    /// drained within the same call. While an event is dispatched the
    /// scheduling base is its own fire time; afterwards it is `now`.
    /// Returns the number of events dispatched.
    pub fn advance<D>(&mut self, now: u64, dispatcher: &mut D) -> usize
    where
        D: Dispatch + ?Sized,
    {
        let mut dispatched = 0;
        while let Some((key, action)) = self.pop_due(now) {
            self.set_current_time(key.fire_time);
            trace!(
                fire_time = key.fire_time,
                entity = action.entity().get(),
                kind = ?action.kind(),
                "dispatching event"
            );
            dispatcher.dispatch(self, action);
            dispatched += 1;
        }
        self.set_current_time(now);
        dispatched
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Reports whether no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of pending events owned by `entity`.
    #[must_use]
    pub fn pending_count(&self, entity: EntityHandle) -> usize {
        self.pending.get(&entity).map_or(0, BTreeSet::len)
    }

    /// Fire time of the earliest pending event.
    #[must_use]
    pub fn next_fire_time(&self) -> Option<u64> {
        self.queue.keys().next().map(|key| key.fire_time)
    }

    fn pop_due(&mut self, now: u64) -> Option<(EventKey, Action)> {
        let (&key, _) = self.queue.first_key_value()?;
        if key.fire_time >= now {
            return None;
        }
        let (key, action) = self.queue.pop_first()?;
        self.forget_pending(action.entity(), key);
        Some((key, action))
    }

    fn forget_pending(&mut self, entity: EntityHandle, key: EventKey) {
        if let Some(keys) = self.pending.get_mut(&entity) {
            let _ = keys.remove(&key);
            if keys.is_empty() {
                let _ = self.pending.remove(&entity);
            }
        }
    }

    /// Scaled period truncated to whole ticks, never shorter than one tick.
    fn scaled(&self, period: u32) -> u64 {
        ((f64::from(period) * self.time_scale) as u64).max(MIN_DELAY)
    }
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
