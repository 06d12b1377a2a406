pub mod github;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use github::GithubCatalog;

/// Upstream catalog identity. Each catalog maps to one GitHub repository.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CatalogId {
    Criteria,
    Atomics,
}

impl CatalogId {
    pub const ALL: [CatalogId; 2] = [CatalogId::Criteria, CatalogId::Atomics];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Criteria => "criteria",
            Self::Atomics => "atomics",
        }
    }

    /// The `owner/repo` slug used against the GitHub API.
    pub fn repo(&self) -> &'static str {
        match self {
            Self::Criteria => "secureworks/atomic-validation-criteria",
            Self::Atomics => "redcanaryco/atomic-red-team",
        }
    }

    /// Listing paths scanned when no explicit paths are configured. The
    /// criteria repo shards files by platform; the atomics repo keeps one
    /// directory per technique under `atomics`.
    pub fn default_paths(&self) -> Vec<String> {
        match self {
            Self::Criteria => vec!["windows".to_string(), "macos".to_string()],
            Self::Atomics => vec!["atomics".to_string()],
        }
    }
}

impl Display for CatalogId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Criteria => "Validation Criteria",
            Self::Atomics => "Atomic Red Team",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown catalog id: {0}")]
pub struct CatalogParseError(pub String);

impl FromStr for CatalogId {
    type Err = CatalogParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "criteria" | "atomic-validation-criteria" => Ok(Self::Criteria),
            "atomics" | "atomic-red-team" => Ok(Self::Atomics),
            _ => Err(CatalogParseError(s.to_string())),
        }
    }
}

/// One entry from a remote directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteFileEntry {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The directory listing itself could not be obtained. Fatal: without a
    /// listing there is no input to reconcile.
    #[error("remote listing unavailable for {catalog} path {path:?}: {detail}")]
    ListingUnavailable {
        catalog: CatalogId,
        path: String,
        detail: String,
    },
    /// The commits API returned an empty history for the path. Per-entry
    /// skip.
    #[error("no commits found for {catalog} path {path:?}")]
    NoCommitsFound { catalog: CatalogId, path: String },
    /// The commit lookup failed outright (network, auth, parse). Per-entry
    /// skip.
    #[error("commit lookup failed for {catalog} path {path:?}: {detail}")]
    LookupFailed {
        catalog: CatalogId,
        path: String,
        detail: String,
    },
}

impl CatalogError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ListingUnavailable { .. })
    }
}

/// Seam to the upstream catalog host. The date-index builder only sees this
/// trait, so tests substitute canned listings and timestamps.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    fn id(&self) -> CatalogId;

    /// Enumerates the files under `path`, in the order the host reports
    /// them. That order determines overwrite order downstream.
    async fn list_files(&self, path: &str) -> Result<Vec<RemoteFileEntry>, CatalogError>;

    /// The newest commit author date touching `path`.
    async fn latest_commit(&self, path: &str) -> Result<DateTime<Utc>, CatalogError>;
}
