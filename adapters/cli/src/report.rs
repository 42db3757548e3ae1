//! Serializable end-of-run report printed by `--dump`.

use std::collections::BTreeMap;

use serde::Serialize;
use virtual_world_model::{query, World};

/// Snapshot of the world captured after the simulated clock stopped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct RunReport {
    /// Simulated time at which the run stopped.
    pub(crate) time: u64,
    /// Number of events dispatched over the whole run.
    pub(crate) dispatched: usize,
    /// Live entities per kind.
    pub(crate) census: BTreeMap<String, usize>,
    /// Every live entity in handle order.
    pub(crate) entities: Vec<query::EntitySnapshot>,
}

impl RunReport {
    /// Captures the report for `world`.
    #[must_use]
    pub(crate) fn capture(world: &World, time: u64, dispatched: usize) -> Self {
        let census = query::census(world)
            .iter()
            .map(|(kind, count)| (format!("{kind:?}"), count))
            .collect();
        Self {
            time,
            dispatched,
            census,
            entities: query::entities(world),
        }
    }

    /// Renders the report as a TOML document.
    pub(crate) fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}
