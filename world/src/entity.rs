//! Entity records and the per-kind factories that fill in their defaults.

use virtual_world_core::{EntityKind, FrameId, Frames, Point};

const QUAKE_ID: &str = "quake";
const QUAKE_ACTION_PERIOD: u32 = 1100;
const QUAKE_ANIMATION_PERIOD: u32 = 100;

/// Simulated actor or static feature placed on the grid.
///
/// The kind is fixed at construction. Changing kind means building a new
/// record through one of the `to_*` conversions and swapping it in with
/// [`crate::World::transform`].
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    kind: EntityKind,
    id: String,
    position: Point,
    frames: Frames,
    image_index: usize,
    resource_limit: u32,
    resource_count: u32,
    action_period: u32,
    animation_period: u32,
}

impl Entity {
    #[allow(clippy::too_many_arguments)]
    fn new(
        kind: EntityKind,
        id: String,
        position: Point,
        frames: Frames,
        resource_limit: u32,
        resource_count: u32,
        action_period: u32,
        animation_period: u32,
    ) -> Self {
        Self {
            kind,
            id,
            position,
            frames,
            image_index: 0,
            resource_limit,
            resource_count: resource_count.min(resource_limit),
            action_period,
            animation_period,
        }
    }

    /// Creates a blacksmith, the drop-off point for full miners.
    #[must_use]
    pub fn blacksmith(id: impl Into<String>, position: Point, frames: Frames) -> Self {
        Self::new(EntityKind::Blacksmith, id.into(), position, frames, 0, 0, 0, 0)
    }

    /// Creates a miner carrying a full load.
    #[must_use]
    pub fn miner_full(
        id: impl Into<String>,
        position: Point,
        resource_limit: u32,
        action_period: u32,
        animation_period: u32,
        frames: Frames,
    ) -> Self {
        Self::new(
            EntityKind::MinerFull,
            id.into(),
            position,
            frames,
            resource_limit,
            resource_limit,
            action_period,
            animation_period,
        )
    }

    /// Creates an empty miner.
    #[must_use]
    pub fn miner_not_full(
        id: impl Into<String>,
        position: Point,
        resource_limit: u32,
        action_period: u32,
        animation_period: u32,
        frames: Frames,
    ) -> Self {
        Self::new(
            EntityKind::MinerNotFull,
            id.into(),
            position,
            frames,
            resource_limit,
            0,
            action_period,
            animation_period,
        )
    }

    /// Creates an obstacle.
    #[must_use]
    pub fn obstacle(id: impl Into<String>, position: Point, frames: Frames) -> Self {
        Self::new(EntityKind::Obstacle, id.into(), position, frames, 0, 0, 0, 0)
    }

    /// Creates an ore deposit that corrupts after `action_period` ticks.
    #[must_use]
    pub fn ore(id: impl Into<String>, position: Point, action_period: u32, frames: Frames) -> Self {
        Self::new(
            EntityKind::Ore,
            id.into(),
            position,
            frames,
            0,
            0,
            action_period,
            0,
        )
    }

    /// Creates an ore blob.
    #[must_use]
    pub fn ore_blob(
        id: impl Into<String>,
        position: Point,
        action_period: u32,
        animation_period: u32,
        frames: Frames,
    ) -> Self {
        Self::new(
            EntityKind::OreBlob,
            id.into(),
            position,
            frames,
            0,
            0,
            action_period,
            animation_period,
        )
    }

    /// Creates a quake with its fixed periods.
    #[must_use]
    pub fn quake(position: Point, frames: Frames) -> Self {
        Self::new(
            EntityKind::Quake,
            QUAKE_ID.to_owned(),
            position,
            frames,
            0,
            0,
            QUAKE_ACTION_PERIOD,
            QUAKE_ANIMATION_PERIOD,
        )
    }

    /// Creates a vein that seeds ore every `action_period` ticks.
    #[must_use]
    pub fn vein(id: impl Into<String>, position: Point, action_period: u32, frames: Frames) -> Self {
        Self::new(
            EntityKind::Vein,
            id.into(),
            position,
            frames,
            0,
            0,
            action_period,
            0,
        )
    }

    /// Full miner at the same position inheriting id, limit, periods and frames.
    #[must_use]
    pub fn to_miner_full(&self) -> Self {
        Self::miner_full(
            self.id.clone(),
            self.position,
            self.resource_limit,
            self.action_period,
            self.animation_period,
            self.frames.clone(),
        )
    }

    /// Empty miner at the same position inheriting id, limit, periods and frames.
    #[must_use]
    pub fn to_miner_not_full(&self) -> Self {
        Self::miner_not_full(
            self.id.clone(),
            self.position,
            self.resource_limit,
            self.action_period,
            self.animation_period,
            self.frames.clone(),
        )
    }

    /// Kind of the entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Diagnostic identifier. Not required to be unique.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cell currently occupied, or [`Point::OFF_GRID`] once removed.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    /// Animation frames assigned to the entity.
    #[must_use]
    pub fn frames(&self) -> &Frames {
        &self.frames
    }

    /// Index of the frame currently displayed.
    #[must_use]
    pub const fn image_index(&self) -> usize {
        self.image_index
    }

    /// Frame currently displayed, if the sequence is non-empty.
    #[must_use]
    pub fn current_frame(&self) -> Option<FrameId> {
        self.frames.get(self.image_index)
    }

    /// Advances the frame index, wrapping at the end of the sequence.
    pub fn next_image(&mut self) {
        if self.frames.is_empty() {
            self.image_index = 0;
        } else {
            self.image_index = (self.image_index + 1) % self.frames.len();
        }
    }

    /// Capacity of a miner.
    #[must_use]
    pub const fn resource_limit(&self) -> u32 {
        self.resource_limit
    }

    /// Resources carried by a miner. Never exceeds [`Self::resource_limit`].
    #[must_use]
    pub const fn resource_count(&self) -> u32 {
        self.resource_count
    }

    /// Adds one unit of resource, saturating at the limit.
    pub fn gather(&mut self) {
        if self.resource_count < self.resource_limit {
            self.resource_count += 1;
        }
    }

    /// Reports whether the carried resources reached the limit.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.resource_count >= self.resource_limit
    }

    /// Ticks between activity events.
    #[must_use]
    pub const fn action_period(&self) -> u32 {
        self.action_period
    }

    /// Ticks between frame advances, present only for animating kinds.
    #[must_use]
    pub const fn animation_period(&self) -> Option<u32> {
        if self.kind.animates() {
            Some(self.animation_period)
        } else {
            None
        }
    }
}
