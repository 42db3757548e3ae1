//! World-file loader.
//!
//! Each line is one space-delimited record whose first token names its kind.
//! Bad lines are reported and skipped; the rest of the file still loads.

use thiserror::Error;
use tracing::warn;
use virtual_world_core::{ImageStore, PlacementError, Point};

use crate::{Background, Entity, World};

const BACKGROUND_KEY: &str = "background";
const MINER_KEY: &str = "miner";
const OBSTACLE_KEY: &str = "obstacle";
const ORE_KEY: &str = "ore";
const SMITH_KEY: &str = "blacksmith";
const VEIN_KEY: &str = "vein";

const BACKGROUND_FIELDS: usize = 4;
const MINER_FIELDS: usize = 7;
const OBSTACLE_FIELDS: usize = 4;
const ORE_FIELDS: usize = 5;
const SMITH_FIELDS: usize = 4;
const VEIN_FIELDS: usize = 5;

/// Problems found while loading a single world-file line.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Unknown record kind, wrong field count, or a non-numeric field.
    #[error("invalid entry on line {line}")]
    Malformed {
        /// Zero-based line number.
        line: usize,
    },
    /// The record's entity could not be placed.
    #[error("issue on line {line}: {source}")]
    Placement {
        /// Zero-based line number.
        line: usize,
        /// Reason the world rejected the placement.
        #[source]
        source: PlacementError,
    },
}

/// Outcome of loading a world file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of entities placed.
    pub entities: usize,
    /// Number of background cells assigned.
    pub backgrounds: usize,
    /// Lines that were rejected.
    pub errors: Vec<LoadError>,
}

enum Record {
    Background {
        image: String,
        position: Point,
    },
    Entity(Entity),
}

/// Loads every record of `source` into `world`.
pub fn load<S>(world: &mut World, source: &str, images: &S) -> LoadReport
where
    S: ImageStore + ?Sized,
{
    let mut report = LoadReport::default();
    for (line, text) in source.lines().enumerate() {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let outcome = match parse_record(&tokens, images) {
            Some(Record::Background { position, .. }) if !world.within_bounds(position) => {
                Err(LoadError::Placement {
                    line,
                    source: PlacementError::OutOfBounds(position),
                })
            }
            Some(Record::Background { image, position }) => {
                let frames = images.image_list(&image);
                world.set_background(position, Background::new(image, frames));
                report.backgrounds += 1;
                Ok(())
            }
            Some(Record::Entity(entity)) => world
                .try_add_entity(entity)
                .map(|_| report.entities += 1)
                .map_err(|source| LoadError::Placement { line, source }),
            None => Err(LoadError::Malformed { line }),
        };

        if let Err(error) = outcome {
            warn!(%error, "skipping world-file record");
            report.errors.push(error);
        }
    }
    report
}

fn parse_record<S>(tokens: &[&str], images: &S) -> Option<Record>
where
    S: ImageStore + ?Sized,
{
    let (&kind, fields) = tokens.split_first()?;
    let expected = match kind {
        BACKGROUND_KEY => BACKGROUND_FIELDS,
        MINER_KEY => MINER_FIELDS,
        OBSTACLE_KEY => OBSTACLE_FIELDS,
        ORE_KEY => ORE_FIELDS,
        SMITH_KEY => SMITH_FIELDS,
        VEIN_KEY => VEIN_FIELDS,
        _ => return None,
    };
    if tokens.len() != expected {
        return None;
    }

    let id = fields[0];
    let position = Point::new(fields[1].parse().ok()?, fields[2].parse().ok()?);
    let period = |index: usize| fields[index].parse::<u32>().ok();

    let record = match kind {
        BACKGROUND_KEY => Record::Background {
            image: id.to_owned(),
            position,
        },
        MINER_KEY => Record::Entity(Entity::miner_not_full(
            id,
            position,
            period(3)?,
            period(4)?,
            period(5)?,
            images.image_list(MINER_KEY),
        )),
        OBSTACLE_KEY => Record::Entity(Entity::obstacle(
            id,
            position,
            images.image_list(OBSTACLE_KEY),
        )),
        ORE_KEY => Record::Entity(Entity::ore(
            id,
            position,
            period(3)?,
            images.image_list(ORE_KEY),
        )),
        SMITH_KEY => Record::Entity(Entity::blacksmith(
            id,
            position,
            images.image_list(SMITH_KEY),
        )),
        _ => Record::Entity(Entity::vein(
            id,
            position,
            period(3)?,
            images.image_list(VEIN_KEY),
        )),
    };
    Some(record)
}
