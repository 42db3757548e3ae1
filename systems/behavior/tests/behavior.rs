use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use virtual_world_core::{EntityHandle, EntityKind, ImageCatalog, ImageStore, Point};
use virtual_world_model::{self as model, query, Background, Entity, World};
use virtual_world_system_behavior::Simulation;
use virtual_world_system_scheduler::{Config, EventScheduler};

fn catalog() -> ImageCatalog {
    ImageCatalog::new()
        .with_frames("miner", 2)
        .with_frames("blob", 3)
        .with_frames("quake", 4)
}

fn empty_world(columns: u32, rows: u32) -> World {
    World::new(
        columns,
        rows,
        Background::new("grass", catalog().image_list("grass")),
    )
}

fn place(world: &mut World, entity: Entity) -> EntityHandle {
    world.try_add_entity(entity).expect("placement succeeds")
}

fn simulation(world: World, seed: u64) -> Simulation<ChaCha8Rng, ImageCatalog> {
    let mut simulation = Simulation::new(
        world,
        EventScheduler::new(Config::default()),
        ChaCha8Rng::seed_from_u64(seed),
        catalog(),
    );
    simulation.schedule_all_actions();
    simulation
}

fn entity_at(simulation: &Simulation<ChaCha8Rng, ImageCatalog>, position: Point) -> &Entity {
    let world = simulation.world();
    world
        .occupant(position)
        .and_then(|handle| world.entity(handle))
        .unwrap_or_else(|| panic!("expected an entity at {position}"))
}

fn frames(key: &str) -> virtual_world_core::Frames {
    catalog().image_list(key)
}

#[test]
fn miner_fills_up_then_empties_at_blacksmith() {
    let mut world = empty_world(5, 1);
    let _smith = place(&mut world, Entity::blacksmith("smith", Point::new(0, 0), frames("blacksmith")));
    let _miner = place(
        &mut world,
        Entity::miner_not_full("bob", Point::new(1, 0), 1, 100, 50, frames("miner")),
    );
    let ore = place(&mut world, Entity::ore("o1", Point::new(2, 0), 30_000, frames("ore")));
    let mut simulation = simulation(world, 1);

    let _ = simulation.advance(101);
    let census = query::census(simulation.world());
    assert_eq!(census.count(EntityKind::Ore), 0, "adjacent ore is mined");
    assert_eq!(census.count(EntityKind::MinerFull), 1);
    assert_eq!(census.count(EntityKind::MinerNotFull), 0);
    assert!(!simulation.world().is_occupied(Point::new(2, 0)));
    assert_eq!(simulation.scheduler().pending_count(ore), 0);

    let full = entity_at(&simulation, Point::new(1, 0));
    assert_eq!(full.kind(), EntityKind::MinerFull);
    assert_eq!(full.id(), "bob");
    assert_eq!(full.resource_count(), 1);

    let _ = simulation.advance(201);
    let empty = entity_at(&simulation, Point::new(1, 0));
    assert_eq!(empty.kind(), EntityKind::MinerNotFull);
    assert_eq!(empty.resource_count(), 0);
    assert_eq!(empty.resource_limit(), 1);
    assert_eq!(
        simulation.scheduler().len(),
        2,
        "only the fresh miner's activity and animation remain"
    );
    assert!(query::occupancy_is_consistent(simulation.world()));
}

#[test]
fn miner_below_limit_keeps_working() {
    let mut world = empty_world(4, 1);
    let miner = place(
        &mut world,
        Entity::miner_not_full("bob", Point::new(0, 0), 3, 100, 50, frames("miner")),
    );
    let _ore = place(&mut world, Entity::ore("o1", Point::new(1, 0), 30_000, frames("ore")));
    let mut simulation = simulation(world, 2);

    let _ = simulation.advance(101);
    let record = simulation.world().entity(miner).expect("miner keeps its handle");
    assert_eq!(record.kind(), EntityKind::MinerNotFull);
    assert_eq!(record.resource_count(), 1);
    assert_eq!(simulation.scheduler().pending_count(miner), 2);
}

#[test]
fn blocked_miner_steps_vertically() {
    let mut world = empty_world(3, 3);
    let miner = place(
        &mut world,
        Entity::miner_not_full("bob", Point::new(0, 0), 1, 100, 50, frames("miner")),
    );
    let _rock = place(&mut world, Entity::obstacle("rock", Point::new(1, 0), frames("obstacle")));
    let _ore = place(&mut world, Entity::ore("o1", Point::new(2, 2), 30_000, frames("ore")));
    let mut simulation = simulation(world, 3);

    let _ = simulation.advance(101);
    let record = simulation.world().entity(miner).expect("miner still present");
    assert_eq!(record.position(), Point::new(0, 1));
    assert_eq!(record.resource_count(), 0);
    assert_eq!(
        simulation.world().occupant_kind(Point::new(1, 0)),
        Some(EntityKind::Obstacle)
    );
    assert!(query::occupancy_is_consistent(simulation.world()));
}

#[test]
fn full_miner_without_blacksmith_waits() {
    let mut world = empty_world(3, 3);
    let miner = place(
        &mut world,
        Entity::miner_full("bob", Point::new(1, 1), 2, 100, 50, frames("miner")),
    );
    let mut simulation = simulation(world, 4);

    let _ = simulation.advance(1_001);
    let record = simulation.world().entity(miner).expect("miner still present");
    assert_eq!(record.position(), Point::new(1, 1));
    assert_eq!(record.kind(), EntityKind::MinerFull);
    assert_eq!(simulation.scheduler().pending_count(miner), 2);
}

#[test]
fn full_miner_walks_around_obstacle_to_blacksmith() {
    let mut world = empty_world(4, 2);
    let _smith = place(&mut world, Entity::blacksmith("smith", Point::new(0, 0), frames("blacksmith")));
    let _rock = place(&mut world, Entity::obstacle("rock", Point::new(2, 1), frames("obstacle")));
    let miner = place(
        &mut world,
        Entity::miner_full("bob", Point::new(3, 1), 2, 100, 50, frames("miner")),
    );
    let mut simulation = simulation(world, 9);

    let _ = simulation.advance(101);
    let record = simulation.world().entity(miner).expect("miner still present");
    assert_eq!(record.position(), Point::new(3, 0), "blocked horizontally, steps up");
    assert_eq!(record.kind(), EntityKind::MinerFull);

    let _ = simulation.advance(301);
    let record = simulation.world().entity(miner).expect("miner still present");
    assert_eq!(record.position(), Point::new(1, 0));
    assert_eq!(record.resource_count(), 2, "load kept until delivery");
    assert_eq!(simulation.scheduler().pending_count(miner), 2);

    let _ = simulation.advance(401);
    assert!(!simulation.world().contains(miner));
    let delivered = entity_at(&simulation, Point::new(1, 0));
    assert_eq!(delivered.kind(), EntityKind::MinerNotFull);
    assert_eq!(delivered.id(), "bob");
    assert_eq!(delivered.resource_count(), 0);
    assert_eq!(
        simulation.world().occupant_kind(Point::new(2, 1)),
        Some(EntityKind::Obstacle)
    );
    assert!(query::occupancy_is_consistent(simulation.world()));
}

#[test]
fn zero_animation_period_does_not_stall_the_clock() {
    let images = catalog();
    let mut world = empty_world(4, 4);
    let report = model::load(&mut world, "miner m 1 1 2 500 0\n", &images);
    assert!(report.errors.is_empty());
    let mut simulation = simulation(world, 10);

    assert_eq!(simulation.advance(1_000), 999 + 1, "one frame per tick plus one activity");
    assert_eq!(simulation.scheduler().current_time(), 1_000);
}

#[test]
fn tiny_time_scale_does_not_stall_the_clock() {
    let images = catalog();
    let mut world = empty_world(4, 4);
    let report = model::load(&mut world, "miner m 1 1 2 500 100\n", &images);
    assert!(report.errors.is_empty());
    let mut simulation = Simulation::new(
        world,
        EventScheduler::new(Config::new(0.001)),
        ChaCha8Rng::seed_from_u64(11),
        images,
    );
    simulation.schedule_all_actions();

    assert_eq!(simulation.advance(1_000), 2 * 999);
    assert_eq!(simulation.scheduler().current_time(), 1_000);
}

#[test]
fn vein_with_full_neighbourhood_spawns_nothing() {
    let mut world = empty_world(3, 3);
    let vein = place(&mut world, Entity::vein("v1", Point::new(1, 1), 500, frames("vein")));
    for y in 0..3 {
        for x in 0..3 {
            if (x, y) != (1, 1) {
                let _ = place(&mut world, Entity::obstacle("rock", Point::new(x, y), frames("obstacle")));
            }
        }
    }
    let mut simulation = simulation(world, 5);

    assert_eq!(simulation.advance(501), 1);
    assert_eq!(query::census(simulation.world()).count(EntityKind::Ore), 0);
    assert_eq!(simulation.scheduler().pending_count(vein), 1, "vein reschedules itself");
}

#[test]
fn vein_seeds_ore_into_first_open_cell() {
    let mut world = empty_world(3, 3);
    let _vein = place(&mut world, Entity::vein("v1", Point::new(1, 1), 500, frames("vein")));
    for position in [Point::new(0, 0), Point::new(1, 0), Point::new(2, 0), Point::new(0, 1)] {
        let _ = place(&mut world, Entity::obstacle("rock", position, frames("obstacle")));
    }
    let mut simulation = simulation(world, 6);

    let _ = simulation.advance(501);
    let ore = entity_at(&simulation, Point::new(2, 1));
    assert_eq!(ore.kind(), EntityKind::Ore);
    assert_eq!(ore.id(), "ore -- v1");
    assert!((20_000..30_000).contains(&ore.action_period()));
}

#[test]
fn ore_corrupts_into_blob_in_place() {
    let mut world = empty_world(3, 3);
    let ore = place(&mut world, Entity::ore("o9", Point::new(2, 2), 400, frames("ore")));
    let mut simulation = simulation(world, 7);

    let _ = simulation.advance(401);
    assert!(!simulation.world().contains(ore));
    let blob = entity_at(&simulation, Point::new(2, 2));
    assert_eq!(blob.kind(), EntityKind::OreBlob);
    assert_eq!(blob.id(), "o9 -- blob");
    assert_eq!(blob.action_period(), 100);
    assert_eq!(blob.frames().len(), 3);

    let handle = simulation
        .world()
        .occupant(Point::new(2, 2))
        .expect("blob placed");
    assert_eq!(simulation.scheduler().pending_count(handle), 2);
}

#[test]
fn blob_tramples_ore_and_quakes_vein() {
    let mut world = empty_world(5, 1);
    let blob = place(
        &mut world,
        Entity::ore_blob("b", Point::new(0, 0), 100, 1_000_000, frames("blob")),
    );
    let ore = place(&mut world, Entity::ore("o1", Point::new(1, 0), 30_000, frames("ore")));
    let vein = place(&mut world, Entity::vein("v1", Point::new(4, 0), 100_000, frames("vein")));
    let mut simulation = simulation(world, 8);

    let _ = simulation.advance(101);
    assert_eq!(
        simulation.world().entity(blob).map(Entity::position),
        Some(Point::new(1, 0))
    );
    assert!(!simulation.world().contains(ore), "trampled ore leaves the world");
    assert_eq!(simulation.scheduler().pending_count(ore), 0);

    let _ = simulation.advance(401);
    assert_eq!(
        simulation.world().entity(blob).map(Entity::position),
        Some(Point::new(3, 0))
    );
    assert!(!simulation.world().contains(vein));
    assert_eq!(simulation.scheduler().pending_count(vein), 0);
    let quake = simulation
        .world()
        .occupant(Point::new(4, 0))
        .expect("quake placed on the vein's cell");
    assert_eq!(
        simulation.world().entity(quake).map(Entity::kind),
        Some(EntityKind::Quake)
    );
    assert_eq!(
        simulation.scheduler().next_fire_time(),
        Some(500),
        "first quake frame precedes the blob's doubled period"
    );

    let _ = simulation.advance(1_450);
    let record = simulation.world().entity(quake).expect("quake still present");
    assert_eq!(record.image_index(), 10 % 4, "quake animates ten frames");
    assert_eq!(simulation.scheduler().pending_count(quake), 1);

    let _ = simulation.advance(1_501);
    assert!(!simulation.world().contains(quake));
    assert_eq!(simulation.scheduler().pending_count(quake), 0);
    assert!(query::occupancy_is_consistent(simulation.world()));
}

const SCENARIO: &str = "\
blacksmith smith 0 0
blacksmith forge 11 7
miner alice 2 2 2 400 120
miner bert 9 5 3 350 90
miner cora 5 6 1 500 100
vein v1 6 1 3000
vein v2 3 5 4200
ore o1 4 2 9000
ore o2 8 3 12000
ore o3 1 6 15000
obstacle rock 6 3
obstacle rock 7 3
obstacle rock 5 4
";

fn run_scenario(seed: u64) -> Vec<query::EntitySnapshot> {
    let images = catalog();
    let mut world = empty_world(12, 8);
    let report = model::load(&mut world, SCENARIO, &images);
    assert!(report.errors.is_empty(), "scenario loads cleanly: {:?}", report.errors);

    let mut simulation = simulation(world, seed);
    for now in (0..=80_000).step_by(250) {
        let _ = simulation.advance(now);
        let world = simulation.world();
        assert!(
            query::occupancy_is_consistent(world),
            "occupancy diverged at {now}"
        );
        for (_, entity) in world.entities() {
            assert!(entity.resource_count() <= entity.resource_limit());
        }
    }
    query::entities(simulation.world())
}

#[test]
fn scenario_replays_deterministically() {
    let first = run_scenario(0x5eed);
    let second = run_scenario(0x5eed);
    assert_eq!(first, second, "replay diverged between runs");
    assert!(
        first.iter().any(|entity| entity.kind == EntityKind::Blacksmith),
        "blacksmiths are never consumed"
    );
}
