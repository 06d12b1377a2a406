pub mod builder;
pub mod resolver;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::technique::TechniqueId;

pub use builder::{build_date_index, DateIndexBuilder};
pub use resolver::{resolve_file_name, RangeError, TechniqueRange};

/// Mapping from technique to the newest upstream commit timestamp known for
/// it. Built once per reconciliation run and discarded afterwards.
///
/// Insertion is last-writer-wins: when a range file and a singleton file
/// both cover the same technique, whichever entry the builder processes
/// later overwrites the earlier timestamp. Remote listings are not assumed
/// to be non-overlapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DateIndex {
    entries: BTreeMap<TechniqueId, DateTime<Utc>>,
}

impl DateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, technique: TechniqueId, timestamp: DateTime<Utc>) {
        self.entries.insert(technique, timestamp);
    }

    pub fn get(&self, technique: &TechniqueId) -> Option<DateTime<Utc>> {
        self.entries.get(technique).copied()
    }

    pub fn contains(&self, technique: &TechniqueId) -> bool {
        self.entries.contains_key(technique)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TechniqueId, &DateTime<Utc>)> {
        self.entries.iter()
    }
}
