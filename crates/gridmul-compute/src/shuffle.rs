//! Keyed grouping between the map and reduce phases.

use std::collections::HashMap;

use gridmul_core::{Cell, GridConfig, MultiplyJob, OutputKey, TaggedPayload};

/// Payloads grouped by output key, plus the count of cells the map stage
/// rejected while filling it.
#[derive(Debug, Default)]
pub struct KeyGroups {
    groups: HashMap<OutputKey, Vec<TaggedPayload>>,
    rejected: usize,
}

impl KeyGroups {
    /// Groups with an empty entry for every key of `grid`, so keys that receive
    /// no payloads are still reduced (to a zero block).
    pub fn seeded(grid: &GridConfig) -> Self {
        Self {
            groups: grid.keys().map(|k| (k, Vec::new())).collect(),
            rejected: 0,
        }
    }

    /// Run the map stage for one cell and file its payloads.
    pub fn map_cell(&mut self, job: &MultiplyJob, cell: &Cell) {
        match job.map(cell) {
            Ok(pairs) => {
                for (key, payload) in pairs {
                    self.groups.entry(key).or_default().push(payload);
                }
            }
            Err(e) => {
                log::debug!("Rejected cell {:?}: {}", cell, e);
                self.rejected += 1;
            }
        }
    }

    /// Merge another partial grouping into this one.
    pub fn merge(mut self, other: KeyGroups) -> Self {
        let (small, large) = if self.groups.len() < other.groups.len() {
            (self.groups, other.groups)
        } else {
            (other.groups, self.groups)
        };
        self.groups = large;
        for (key, mut payloads) in small {
            self.groups.entry(key).or_default().append(&mut payloads);
        }
        self.rejected += other.rejected;
        self
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn key_count(&self) -> usize {
        self.groups.len()
    }

    pub fn payload_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Consume the grouping, yielding `(key, payloads)` pairs.
    pub fn into_groups(self) -> HashMap<OutputKey, Vec<TaggedPayload>> {
        self.groups
    }
}
