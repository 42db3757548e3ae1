use virtual_world_core::{Action, EntityHandle};
use virtual_world_system_scheduler::{Config, Dispatch, EventScheduler};

#[derive(Default)]
struct Recorder {
    fired: Vec<(u64, Action)>,
    follow_ups: u32,
}

impl Dispatch for Recorder {
    fn dispatch(&mut self, scheduler: &mut EventScheduler, action: Action) {
        self.fired.push((scheduler.current_time(), action));
        if self.follow_ups > 0 {
            self.follow_ups -= 1;
            let _ = scheduler.schedule_event(action.entity(), action, 10);
        }
    }
}

fn activity(entity: EntityHandle) -> Action {
    Action::Activity { entity }
}

#[test]
fn second_advance_to_same_time_fires_nothing() {
    let mut scheduler = EventScheduler::new(Config::default());
    let entity = EntityHandle::new(1);
    let _ = scheduler.schedule_event(entity, activity(entity), 10);
    let _ = scheduler.schedule_event(entity, activity(entity), 40);

    let mut recorder = Recorder::default();
    assert_eq!(scheduler.advance(30, &mut recorder), 1);
    assert_eq!(scheduler.advance(30, &mut recorder), 0);
    assert_eq!(recorder.fired.len(), 1);
    assert_eq!(scheduler.len(), 1);
}

#[test]
fn chained_events_due_before_now_drain_in_one_call() {
    let mut scheduler = EventScheduler::new(Config::default());
    let entity = EntityHandle::new(4);
    let _ = scheduler.schedule_event(entity, activity(entity), 10);

    let mut recorder = Recorder {
        follow_ups: 5,
        ..Recorder::default()
    };
    let dispatched = scheduler.advance(45, &mut recorder);

    let times: Vec<u64> = recorder.fired.iter().map(|(time, _)| *time).collect();
    assert_eq!(times, vec![10, 20, 30, 40]);
    assert_eq!(dispatched, 4);
    assert_eq!(scheduler.next_fire_time(), Some(50));
    assert_eq!(scheduler.current_time(), 45);
}

#[test]
fn cancelled_entity_never_dispatches() {
    let mut scheduler = EventScheduler::new(Config::new(2.0));
    let doomed = EntityHandle::new(1);
    let survivor = EntityHandle::new(2);
    for period in [1, 5, 50] {
        let _ = scheduler.schedule_event(doomed, activity(doomed), period);
        let _ = scheduler.schedule_event(
            doomed,
            Action::Animation {
                entity: doomed,
                repeat_count: 0,
            },
            period,
        );
    }
    let _ = scheduler.schedule_event(survivor, activity(survivor), 3);

    assert_eq!(scheduler.unschedule_all_events(doomed), 6);

    let mut recorder = Recorder::default();
    let _ = scheduler.advance(u64::MAX, &mut recorder);
    assert!(recorder
        .fired
        .iter()
        .all(|(_, action)| action.entity() != doomed));
    assert_eq!(recorder.fired.len(), 1);
}

#[test]
fn zero_period_rescheduling_still_returns() {
    let mut scheduler = EventScheduler::new(Config::default());
    let entity = EntityHandle::new(9);
    let _ = scheduler.schedule_event(entity, activity(entity), 0);

    let mut fired = Vec::new();
    let dispatched = scheduler.advance(50, &mut |scheduler: &mut EventScheduler, action: Action| {
        fired.push(scheduler.current_time());
        let _ = scheduler.schedule_event(action.entity(), action, 0);
    });

    assert_eq!(dispatched, 49, "one firing per tick in [1, 50)");
    assert_eq!(fired.first(), Some(&1));
    assert_eq!(fired.last(), Some(&49));
    assert_eq!(scheduler.next_fire_time(), Some(50));
}

#[test]
fn tiny_time_scale_still_returns() {
    let mut scheduler = EventScheduler::new(Config::new(0.001));
    let entity = EntityHandle::new(2);
    let _ = scheduler.schedule_event(entity, activity(entity), 100);

    let mut recorder = Recorder {
        follow_ups: u32::MAX,
        ..Recorder::default()
    };
    assert_eq!(scheduler.advance(1_000, &mut recorder), 999);
    assert_eq!(scheduler.pending_count(entity), 1);
    assert_eq!(scheduler.current_time(), 1_000);
}
