use tracing::{debug, warn};

use crate::catalog::{RemoteCatalog, RemoteFileEntry};
use crate::index::resolver::resolve_file_name;
use crate::index::DateIndex;

/// Accumulates technique timestamps from one or more remote listings.
///
/// Listings are ingested in order and entries within a listing are applied
/// in listing order, so on overlapping coverage the last entry processed
/// owns the key.
#[derive(Debug, Default)]
pub struct DateIndexBuilder {
    index: DateIndex,
}

impl DateIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one listing into the index. Entries whose name cannot be
    /// resolved, or whose commit lookup fails, are skipped; neither aborts
    /// the build.
    pub async fn ingest(&mut self, catalog: &dyn RemoteCatalog, entries: &[RemoteFileEntry]) {
        for entry in entries {
            let range = match resolve_file_name(&entry.name) {
                Ok(range) => range,
                Err(error) => {
                    warn!("skipping {} entry {}: {error}", catalog.id(), entry.name);
                    continue;
                }
            };
            let timestamp = match catalog.latest_commit(&entry.path).await {
                Ok(timestamp) => timestamp,
                Err(error) => {
                    warn!("skipping {} entry {}: {error}", catalog.id(), entry.name);
                    continue;
                }
            };
            for technique in range {
                debug!("assigning {technique} to {timestamp} from {}", entry.name);
                self.index.insert(technique, timestamp);
            }
        }
    }

    pub fn finish(self) -> DateIndex {
        self.index
    }
}

/// Builds a fresh index from a single listing.
pub async fn build_date_index(
    catalog: &dyn RemoteCatalog,
    entries: &[RemoteFileEntry],
) -> DateIndex {
    let mut builder = DateIndexBuilder::new();
    builder.ingest(catalog, entries).await;
    builder.finish()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::catalog::{CatalogError, CatalogId, RemoteCatalog, RemoteFileEntry};
    use crate::index::builder::{build_date_index, DateIndexBuilder};
    use crate::technique::TechniqueId;

    struct StubCatalog {
        dates: BTreeMap<String, DateTime<Utc>>,
    }

    impl StubCatalog {
        fn new(dates: &[(&str, DateTime<Utc>)]) -> Self {
            Self {
                dates: dates
                    .iter()
                    .map(|(path, date)| ((*path).to_string(), *date))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl RemoteCatalog for StubCatalog {
        fn id(&self) -> CatalogId {
            CatalogId::Criteria
        }

        async fn list_files(&self, path: &str) -> Result<Vec<RemoteFileEntry>, CatalogError> {
            Err(CatalogError::ListingUnavailable {
                catalog: self.id(),
                path: path.to_string(),
                detail: "not used by these tests".to_string(),
            })
        }

        async fn latest_commit(&self, path: &str) -> Result<DateTime<Utc>, CatalogError> {
            self.dates
                .get(path)
                .copied()
                .ok_or(CatalogError::NoCommitsFound {
                    catalog: self.id(),
                    path: path.to_string(),
                })
        }
    }

    fn entry(name: &str, path: &str) -> RemoteFileEntry {
        RemoteFileEntry {
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    fn tid(s: &str) -> TechniqueId {
        s.parse().expect("bad technique id in test")
    }

    fn day(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn fans_range_timestamp_out_to_every_covered_technique() {
        let catalog = StubCatalog::new(&[("windows/T1027-T1047.csv", day(25))]);
        let entries = vec![entry("T1027-T1047.csv", "windows/T1027-T1047.csv")];

        let index = build_date_index(&catalog, &entries).await;

        assert_eq!(index.len(), 21);
        assert_eq!(index.get(&tid("T1034")), Some(day(25)));
        assert!(!index.contains(&tid("T1048")));
    }

    #[tokio::test]
    async fn later_entries_overwrite_overlapping_ranges() {
        let catalog = StubCatalog::new(&[("a/T1-T5.csv", day(1)), ("b/T3-T4.csv", day(2))]);
        let entries = vec![entry("T1-T5.csv", "a/T1-T5.csv"), entry("T3-T4.csv", "b/T3-T4.csv")];

        let index = build_date_index(&catalog, &entries).await;

        assert_eq!(index.get(&tid("T1")), Some(day(1)));
        assert_eq!(index.get(&tid("T2")), Some(day(1)));
        assert_eq!(index.get(&tid("T3")), Some(day(2)));
        assert_eq!(index.get(&tid("T4")), Some(day(2)));
        assert_eq!(index.get(&tid("T5")), Some(day(1)));
    }

    #[tokio::test]
    async fn unresolvable_and_unlookupable_entries_are_skipped() {
        let catalog = StubCatalog::new(&[("macos/T1000_macos.csv", day(3))]);
        let entries = vec![
            entry("readme.md", "readme.md"),
            entry("T1050-T1040.csv", "windows/T1050-T1040.csv"),
            entry("T9999.csv", "windows/T9999.csv"),
            entry("T1000_macos.csv", "macos/T1000_macos.csv"),
        ];

        let index = build_date_index(&catalog, &entries).await;

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&tid("T1000")), Some(day(3)));
    }

    #[tokio::test]
    async fn ingesting_multiple_listings_accumulates_in_order() {
        let catalog = StubCatalog::new(&[
            ("windows/T10.csv", day(1)),
            ("macos/T10_macos.csv", day(9)),
        ]);
        let windows = vec![entry("T10.csv", "windows/T10.csv")];
        let macos = vec![entry("T10_macos.csv", "macos/T10_macos.csv")];

        let mut builder = DateIndexBuilder::new();
        builder.ingest(&catalog, &windows).await;
        builder.ingest(&catalog, &macos).await;
        let index = builder.finish();

        assert_eq!(index.get(&tid("T10")), Some(day(9)));
    }

    #[tokio::test]
    async fn rebuilding_from_identical_inputs_is_idempotent() {
        let catalog = StubCatalog::new(&[("a/T1-T3.csv", day(1)), ("b/T7.csv", day(2))]);
        let entries = vec![entry("T1-T3.csv", "a/T1-T3.csv"), entry("T7.csv", "b/T7.csv")];

        let first = build_date_index(&catalog, &entries).await;
        let second = build_date_index(&catalog, &entries).await;

        assert_eq!(first, second);
    }
}
