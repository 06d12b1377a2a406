use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::DateIndex;
use crate::localindex::LocalTestSpec;
use crate::technique::TechniqueId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StalenessStatus {
    /// The technique exists upstream; the attached timestamp is the key a
    /// reviewer compares against.
    Dated,
    /// The technique has no upstream counterpart in the listed paths.
    NotFoundRemotely,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StalenessEntry {
    pub technique: TechniqueId,
    pub status: StalenessStatus,
    pub local_found: bool,
    /// Representative local test for the technique; the report is keyed by
    /// technique, so one of possibly many entries suffices.
    pub test_id: String,
    pub source_file: String,
    pub remote_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StalenessReport {
    pub entries: Vec<StalenessEntry>,
}

impl StalenessReport {
    pub fn dated_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == StalenessStatus::Dated)
            .count()
    }

    pub fn not_found_count(&self) -> usize {
        self.entries.len().saturating_sub(self.dated_count())
    }
}

/// Classifies every distinct local technique against the date index, in the
/// iteration order of the local mapping.
pub fn reconcile(
    index: &DateIndex,
    local: &BTreeMap<TechniqueId, Vec<LocalTestSpec>>,
) -> StalenessReport {
    let mut entries = Vec::with_capacity(local.len());
    for (technique, specs) in local {
        let representative = specs.first();
        let (test_id, source_file) = representative
            .map(|spec| (spec.test_id.clone(), spec.source_file.clone()))
            .unwrap_or_default();
        let remote_timestamp = index.get(technique);
        let status = if remote_timestamp.is_some() {
            StalenessStatus::Dated
        } else {
            StalenessStatus::NotFoundRemotely
        };
        entries.push(StalenessEntry {
            technique: *technique,
            status,
            local_found: true,
            test_id,
            source_file,
            remote_timestamp,
        });
    }
    StalenessReport { entries }
}
