#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the virtual world simulation.
//!
//! This crate defines the vocabulary that connects the authoritative world
//! model, the event scheduler, and the per-kind behavior system. Grid geometry
//! lives here as pure functions over [`Point`]; entities are referenced by
//! [`EntityHandle`] everywhere outside the world's own arena, and scheduled
//! work is described by [`Action`] values.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a single grid cell expressed as column (`x`) and row (`y`).
///
/// Coordinates are signed so that neighbourhood scans and the off-grid
/// sentinel can be expressed without wrapping arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    /// Position assigned to entities after they leave the world.
    pub const OFF_GRID: Point = Point::new(-1, -1);

    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the coordinate displaced by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Reports whether the two cells share an edge (4-connectivity).
    #[must_use]
    pub fn adjacent(self, other: Point) -> bool {
        (self.x == other.x && self.y.abs_diff(other.y) == 1)
            || (self.y == other.y && self.x.abs_diff(other.x) == 1)
    }

    /// Sum of squared axis deltas. Only meaningful for comparisons.
    #[must_use]
    pub fn distance_squared(self, other: Point) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Greedy, axis-prioritised single step from `from` toward `dest`.
///
/// The horizontal step is attempted first; when it is not needed or not
/// passable the vertical step is attempted. If neither applies the mover
/// stays at `from`. Passability is supplied by the caller because it differs
/// per mover kind.
#[must_use]
pub fn next_step_toward<F>(from: Point, dest: Point, passable: F) -> Point
where
    F: Fn(Point) -> bool,
{
    let horizontal = (dest.x() - from.x()).signum();
    if horizontal != 0 {
        let candidate = from.offset(horizontal, 0);
        if passable(candidate) {
            return candidate;
        }
    }

    let vertical = (dest.y() - from.y()).signum();
    if vertical != 0 {
        let candidate = from.offset(0, vertical);
        if passable(candidate) {
            return candidate;
        }
    }

    from
}

/// Closed set of entity kinds. Behavior dispatch is purely a function of kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Drop-off point for full miners.
    Blacksmith,
    /// Miner carrying a full load on its way to a blacksmith.
    MinerFull,
    /// Miner searching for ore.
    MinerNotFull,
    /// Static impassable feature.
    Obstacle,
    /// Mineable resource that corrupts into a blob when left alone.
    Ore,
    /// Corrupted ore that hunts veins.
    OreBlob,
    /// Short-lived disturbance left where a blob met a vein.
    Quake,
    /// Source that periodically seeds ore around itself.
    Vein,
}

impl EntityKind {
    /// Every kind in declaration order.
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Blacksmith,
        EntityKind::MinerFull,
        EntityKind::MinerNotFull,
        EntityKind::Obstacle,
        EntityKind::Ore,
        EntityKind::OreBlob,
        EntityKind::Quake,
        EntityKind::Vein,
    ];

    /// Reports whether entities of this kind carry an animation period.
    #[must_use]
    pub const fn animates(self) -> bool {
        matches!(
            self,
            Self::MinerFull | Self::MinerNotFull | Self::OreBlob | Self::Quake
        )
    }

    /// Reports whether entities of this kind are driven by activity events.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Blacksmith | Self::Obstacle)
    }
}

/// Stable arena handle assigned to an entity by the world.
///
/// Handles are never reused, so a stale reference held by the scheduler can
/// never alias a newer entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(u32);

impl EntityHandle {
    /// Creates a new handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Discriminates the two kinds of scheduled work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Runs the owning entity's kind-specific behavior.
    Activity,
    /// Advances the owning entity's animation frame.
    Animation,
}

/// Work item carried by a scheduled event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Runs the kind-specific activity handler of `entity`.
    Activity {
        /// Entity whose behavior runs.
        entity: EntityHandle,
    },
    /// Advances the animation frame of `entity`.
    Animation {
        /// Entity whose frame index advances.
        entity: EntityHandle,
        /// Remaining repetitions; `0` animates until cancelled.
        repeat_count: u32,
    },
}

impl Action {
    /// Entity targeted by the action, which is also the event's owner.
    #[must_use]
    pub const fn entity(&self) -> EntityHandle {
        match self {
            Self::Activity { entity } | Self::Animation { entity, .. } => *entity,
        }
    }

    /// Discriminant of the action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Activity { .. } => ActionKind::Activity,
            Self::Animation { .. } => ActionKind::Animation,
        }
    }
}

/// Opaque handle to a single animation frame owned by an asset store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameId(u32);

impl FrameId {
    /// Creates a new frame handle.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the frame handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Immutable ordered frame sequence shared between entities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frames(Arc<[FrameId]>);

impl Frames {
    /// Wraps the provided frames.
    #[must_use]
    pub fn new(frames: Vec<FrameId>) -> Self {
        Self(frames.into())
    }

    /// Number of frames in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Reports whether the sequence has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Frame stored at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<FrameId> {
        self.0.get(index).copied()
    }
}

/// Asset store consulted whenever an entity or background needs frames.
pub trait ImageStore {
    /// Frames registered under `key`, or a default sequence when unknown.
    fn image_list(&self, key: &str) -> Frames;
}

/// In-memory [`ImageStore`] keyed by string.
#[derive(Clone, Debug)]
pub struct ImageCatalog {
    lists: HashMap<String, Frames>,
    default_frames: Frames,
    next_frame: u32,
}

impl ImageCatalog {
    /// Creates an empty catalog whose fallback is a single frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lists: HashMap::new(),
            default_frames: Frames::new(vec![FrameId::new(0)]),
            next_frame: 1,
        }
    }

    /// Registers `count` freshly allocated frames under `key`.
    #[must_use]
    pub fn with_frames(mut self, key: &str, count: u32) -> Self {
        let start = self.next_frame;
        self.next_frame = self.next_frame.saturating_add(count);
        let frames = (start..self.next_frame).map(FrameId::new).collect();
        let _ = self.lists.insert(key.to_owned(), Frames::new(frames));
        self
    }
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore for ImageCatalog {
    fn image_list(&self, key: &str) -> Frames {
        self.lists
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.default_frames.clone())
    }
}

/// Reasons an entity placement may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell already holds an entity.
    #[error("position {0} occupied")]
    Occupied(Point),
    /// The requested cell lies outside the grid.
    #[error("position {0} outside the world")]
    OutOfBounds(Point),
}
