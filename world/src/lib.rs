#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the virtual world simulation.
//!
//! The [`World`] owns every live entity in an arena keyed by
//! [`EntityHandle`] and mirrors their positions in a dense occupancy grid. A
//! cell is occupied exactly when a live entity stands on it, and only
//! in-bounds cells can ever be occupied.

mod entity;
mod load;

use std::collections::BTreeMap;

use tracing::{debug, warn};
use virtual_world_core::{EntityHandle, EntityKind, Frames, PlacementError, Point};

pub use entity::Entity;
pub use load::{load, LoadError, LoadReport};

const ORE_REACH: i32 = 1;

/// Image layer drawn beneath entities. Carries no behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct Background {
    id: String,
    frames: Frames,
}

impl Background {
    /// Creates a background tile description.
    #[must_use]
    pub fn new(id: impl Into<String>, frames: Frames) -> Self {
        Self {
            id: id.into(),
            frames,
        }
    }

    /// Image identifier of the background.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Frames used to draw the background.
    #[must_use]
    pub fn frames(&self) -> &Frames {
        &self.frames
    }
}

/// Represents the authoritative world state.
#[derive(Debug)]
pub struct World {
    background: Vec<Background>,
    occupancy: OccupancyGrid,
    entities: BTreeMap<EntityHandle, Entity>,
    next_handle: u32,
}

impl World {
    /// Creates an empty world whose cells all share `default_background`.
    #[must_use]
    pub fn new(columns: u32, rows: u32, default_background: Background) -> Self {
        let occupancy = OccupancyGrid::new(columns, rows);
        let background = vec![default_background; occupancy.cells.len()];
        Self {
            background,
            occupancy,
            entities: BTreeMap::new(),
            next_handle: 0,
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.occupancy.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.occupancy.rows
    }

    /// Reports whether the cell lies within `[0, columns) x [0, rows)`.
    #[must_use]
    pub fn within_bounds(&self, position: Point) -> bool {
        self.occupancy.index(position).is_some()
    }

    /// Places `entity` on its cell and returns the handle assigned to it.
    ///
    /// The cell is assumed to be free. Entities positioned outside the grid
    /// are dropped and `None` is returned.
    pub fn add_entity(&mut self, entity: Entity) -> Option<EntityHandle> {
        let position = entity.position();
        if !self.within_bounds(position) {
            debug!(id = entity.id(), %position, "dropping entity placed outside the world");
            return None;
        }

        let handle = EntityHandle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.occupancy.occupy(handle, position);
        let _ = self.entities.insert(handle, entity);
        Some(handle)
    }

    /// Places `entity` after checking that its cell is in bounds and free.
    ///
    /// On rejection the world is left unchanged.
    pub fn try_add_entity(&mut self, entity: Entity) -> Result<EntityHandle, PlacementError> {
        let position = entity.position();
        if self.is_occupied(position) {
            return Err(PlacementError::Occupied(position));
        }
        self.add_entity(entity)
            .ok_or(PlacementError::OutOfBounds(position))
    }

    /// Moves the entity to `position`, evicting whatever stood there.
    ///
    /// Nothing happens when the entity is unknown, the destination is out of
    /// bounds, or the entity already stands there. The evicted occupant is
    /// removed from the world and its handle returned; cancelling its
    /// scheduled events is the caller's job.
    pub fn move_entity(&mut self, handle: EntityHandle, position: Point) -> Option<EntityHandle> {
        let current = self.entities.get(&handle)?.position();
        if !self.within_bounds(position) || current == position {
            return None;
        }

        let evicted = self.occupancy.occupant(position);
        if let Some(occupant) = evicted {
            let _ = self.remove_entity(occupant);
        }

        self.occupancy.vacate(current);
        self.occupancy.occupy(handle, position);
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.set_position(position);
        }
        evicted
    }

    /// Removes the entity from the world and returns its detached record.
    ///
    /// The returned record's position is [`Point::OFF_GRID`].
    pub fn remove_entity(&mut self, handle: EntityHandle) -> Option<Entity> {
        let mut entity = self.entities.remove(&handle)?;
        self.occupancy.vacate(entity.position());
        entity.set_position(Point::OFF_GRID);
        Some(entity)
    }

    /// Replaces the entity with the record built by `replacement`, in place.
    ///
    /// The new record is registered under a fresh handle so events pending
    /// for the old handle can never reach it.
    pub fn transform<F>(&mut self, handle: EntityHandle, replacement: F) -> Option<EntityHandle>
    where
        F: FnOnce(&Entity) -> Entity,
    {
        let entity = replacement(self.entities.get(&handle)?);
        let _ = self.remove_entity(handle)?;
        self.add_entity(entity)
    }

    /// Reports whether an in-bounds cell holds an entity.
    #[must_use]
    pub fn is_occupied(&self, position: Point) -> bool {
        self.occupancy.occupant(position).is_some()
    }

    /// Handle of the entity standing on the cell, if any.
    #[must_use]
    pub fn occupant(&self, position: Point) -> Option<EntityHandle> {
        self.occupancy.occupant(position)
    }

    /// Kind of the entity standing on the cell, if any.
    #[must_use]
    pub fn occupant_kind(&self, position: Point) -> Option<EntityKind> {
        self.occupant(position)
            .and_then(|handle| self.entity(handle))
            .map(Entity::kind)
    }

    /// Live entity registered under `handle`.
    #[must_use]
    pub fn entity(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.get(&handle)
    }

    /// Mutable access to a live entity. Position stays owned by the world.
    pub fn entity_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(&handle)
    }

    /// Reports whether `handle` refers to a live entity.
    #[must_use]
    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.entities.contains_key(&handle)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Reports whether the world holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entities in handle order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityHandle, &Entity)> {
        self.entities.iter().map(|(handle, entity)| (*handle, entity))
    }

    /// Entity of `kind` closest to `position` by squared distance.
    ///
    /// Ties go to the lowest handle, i.e. the entity placed first.
    #[must_use]
    pub fn find_nearest(&self, position: Point, kind: EntityKind) -> Option<EntityHandle> {
        self.entities
            .iter()
            .filter(|(_, entity)| entity.kind() == kind)
            .min_by_key(|(_, entity)| entity.position().distance_squared(position))
            .map(|(handle, _)| *handle)
    }

    /// First free in-bounds cell of the 3x3 neighbourhood, scanned row-major.
    #[must_use]
    pub fn find_open_around(&self, position: Point) -> Option<Point> {
        (-ORE_REACH..=ORE_REACH)
            .flat_map(|dy| (-ORE_REACH..=ORE_REACH).map(move |dx| position.offset(dx, dy)))
            .find(|candidate| self.within_bounds(*candidate) && !self.is_occupied(*candidate))
    }

    /// Replaces the background of a single cell. Out-of-bounds cells are ignored.
    pub fn set_background(&mut self, position: Point, background: Background) {
        if let Some(slot) = self
            .occupancy
            .index(position)
            .and_then(|index| self.background.get_mut(index))
        {
            *slot = background;
        }
    }

    /// Background of the cell, or `None` outside the grid.
    #[must_use]
    pub fn background(&self, position: Point) -> Option<&Background> {
        self.occupancy
            .index(position)
            .and_then(|index| self.background.get(index))
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::collections::BTreeMap;

    use serde::Serialize;
    use virtual_world_core::{EntityHandle, EntityKind, Point};

    use super::World;

    /// Number of live entities per kind.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
    pub struct Census {
        counts: BTreeMap<EntityKind, usize>,
    }

    impl Census {
        /// Number of live entities of `kind`.
        #[must_use]
        pub fn count(&self, kind: EntityKind) -> usize {
            self.counts.get(&kind).copied().unwrap_or(0)
        }

        /// Total number of live entities.
        #[must_use]
        pub fn total(&self) -> usize {
            self.counts.values().sum()
        }

        /// Kinds with at least one live entity, with their counts.
        pub fn iter(&self) -> impl Iterator<Item = (EntityKind, usize)> + '_ {
            self.counts.iter().map(|(kind, count)| (*kind, *count))
        }
    }

    /// Immutable representation of a single entity used for queries.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct EntitySnapshot {
        /// Arena handle of the entity.
        pub handle: EntityHandle,
        /// Diagnostic identifier.
        pub id: String,
        /// Kind of the entity.
        pub kind: EntityKind,
        /// Cell occupied by the entity.
        pub position: Point,
        /// Resources carried, meaningful for miners.
        pub resource_count: u32,
        /// Miner capacity.
        pub resource_limit: u32,
        /// Current animation frame index.
        pub image_index: usize,
    }

    /// Counts live entities per kind.
    #[must_use]
    pub fn census(world: &World) -> Census {
        let mut counts = BTreeMap::new();
        for (_, entity) in world.entities() {
            *counts.entry(entity.kind()).or_insert(0) += 1;
        }
        Census { counts }
    }

    /// Captures snapshots of all live entities in handle order.
    #[must_use]
    pub fn entities(world: &World) -> Vec<EntitySnapshot> {
        world
            .entities()
            .map(|(handle, entity)| EntitySnapshot {
                handle,
                id: entity.id().to_owned(),
                kind: entity.kind(),
                position: entity.position(),
                resource_count: entity.resource_count(),
                resource_limit: entity.resource_limit(),
                image_index: entity.image_index(),
            })
            .collect()
    }

    /// Verifies that the occupancy grid and the live set agree cell for cell.
    #[must_use]
    pub fn occupancy_is_consistent(world: &World) -> bool {
        let live_agree = world
            .entities()
            .all(|(handle, entity)| world.occupant(entity.position()) == Some(handle));
        let grid_agree = world
            .occupancy
            .cells
            .iter()
            .flatten()
            .all(|handle| world.contains(*handle));
        let occupied = world.occupancy.cells.iter().flatten().count();
        live_agree && grid_agree && occupied == world.len()
    }
}

#[derive(Clone, Debug)]
struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<EntityHandle>>,
}

impl OccupancyGrid {
    /// Grid of `columns x rows` cells. Dimensions whose cell count does not
    /// fit in memory collapse to an empty grid so no position is in bounds.
    fn new(columns: u32, rows: u32) -> Self {
        let capacity = u64::from(columns) * u64::from(rows);
        match usize::try_from(capacity) {
            Ok(capacity) => Self {
                columns,
                rows,
                cells: vec![None; capacity],
            },
            Err(_) => {
                warn!(columns, rows, "grid dimensions exceed addressable memory");
                Self {
                    columns: 0,
                    rows: 0,
                    cells: Vec::new(),
                }
            }
        }
    }

    fn occupant(&self, position: Point) -> Option<EntityHandle> {
        self.index(position)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    fn occupy(&mut self, handle: EntityHandle, position: Point) {
        if let Some(slot) = self.index(position).and_then(|index| self.cells.get_mut(index)) {
            *slot = Some(handle);
        }
    }

    fn vacate(&mut self, position: Point) {
        if let Some(slot) = self.index(position).and_then(|index| self.cells.get_mut(index)) {
            *slot = None;
        }
    }

    fn index(&self, position: Point) -> Option<usize> {
        let column = u32::try_from(position.x()).ok()?;
        let row = u32::try_from(position.y()).ok()?;
        if column < self.columns && row < self.rows {
            let row = usize::try_from(row).ok()?;
            let column = usize::try_from(column).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            let index = row.checked_mul(width)?.checked_add(column)?;
            (index < self.cells.len()).then_some(index)
        } else {
            None
        }
    }
}
