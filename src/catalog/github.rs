use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::catalog::{CatalogError, CatalogId, RemoteCatalog, RemoteFileEntry};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 12;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 6;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("atomic-drift/0.1")
        .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .build()
        .expect("failed to build HTTP client")
});

#[derive(Debug, Deserialize)]
struct CommitInfo {
    commit: CommitBody,
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    author: CommitAuthor,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    date: DateTime<Utc>,
}

/// GitHub-backed catalog collaborator. Listings come from the contents API
/// and timestamps from the commits API, both unauthenticated unless a token
/// is supplied.
pub struct GithubCatalog {
    id: CatalogId,
    api_base: String,
    token: Option<String>,
    audit_dir: Option<PathBuf>,
}

impl GithubCatalog {
    pub fn new(id: CatalogId) -> Self {
        Self {
            id,
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            audit_dir: None,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// When set, raw commits API payloads are written verbatim under this
    /// directory for audit purposes.
    pub fn with_audit_dir(mut self, audit_dir: Option<PathBuf>) -> Self {
        self.audit_dir = audit_dir;
        self
    }

    async fn fetch_text(&self, url: &str) -> Result<String, String> {
        let mut request = HTTP_CLIENT.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| format!("failed GET request: {e}"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed reading response body: {e}"))?;
        if !status.is_success() {
            let preview: String = body.chars().take(180).collect();
            return Err(format!("GET {url} returned {status}: {preview}"));
        }
        Ok(body)
    }

    fn persist_audit_payload(&self, path: &str, payload: &str) {
        let Some(dir) = &self.audit_dir else {
            return;
        };
        let file_name = format!(
            "commits-{}-{}.json",
            self.id.as_slug(),
            path.trim_matches('/').replace('/', "_")
        );
        let target = dir.join(file_name);
        let write = fs::create_dir_all(dir).and_then(|()| fs::write(&target, payload));
        if let Err(error) = write {
            warn!("failed writing audit payload {}: {error}", target.display());
        }
    }
}

#[async_trait]
impl RemoteCatalog for GithubCatalog {
    fn id(&self) -> CatalogId {
        self.id
    }

    async fn list_files(&self, path: &str) -> Result<Vec<RemoteFileEntry>, CatalogError> {
        let url = format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.id.repo(),
            path.trim_start_matches('/')
        );
        let body =
            self.fetch_text(&url)
                .await
                .map_err(|detail| CatalogError::ListingUnavailable {
                    catalog: self.id,
                    path: path.to_string(),
                    detail,
                })?;
        let entries: Vec<RemoteFileEntry> =
            serde_json::from_str(&body).map_err(|e| CatalogError::ListingUnavailable {
                catalog: self.id,
                path: path.to_string(),
                detail: format!("invalid listing JSON: {e}"),
            })?;
        debug!(
            "listed {} entries under {} {path}",
            entries.len(),
            self.id.repo()
        );
        Ok(entries)
    }

    async fn latest_commit(&self, path: &str) -> Result<DateTime<Utc>, CatalogError> {
        let url = format!(
            "{}/repos/{}/commits?path={}",
            self.api_base,
            self.id.repo(),
            path
        );
        let body = self
            .fetch_text(&url)
            .await
            .map_err(|detail| CatalogError::LookupFailed {
                catalog: self.id,
                path: path.to_string(),
                detail,
            })?;
        let commits: Vec<CommitInfo> =
            serde_json::from_str(&body).map_err(|e| CatalogError::LookupFailed {
                catalog: self.id,
                path: path.to_string(),
                detail: format!("invalid commits JSON: {e}"),
            })?;

        self.persist_audit_payload(path, &body);

        // The API usually sorts newest first, but that ordering is not
        // contractual. Take the maximum author date explicitly.
        commits
            .iter()
            .map(|c| c.commit.author.date)
            .max()
            .ok_or(CatalogError::NoCommitsFound {
                catalog: self.id,
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::CommitInfo;

    #[test]
    fn deserializes_commit_author_dates() {
        let payload = r#"[
            {"commit": {"author": {"name": "a", "date": "2023-05-25T20:38:57Z"}}},
            {"commit": {"author": {"name": "b", "date": "2021-01-02T03:04:05Z"}}}
        ]"#;
        let commits: Vec<CommitInfo> =
            serde_json::from_str(payload).expect("failed to parse commits payload");
        let newest: DateTime<Utc> = commits
            .iter()
            .map(|c| c.commit.author.date)
            .max()
            .expect("no commits parsed");
        assert_eq!(newest.to_rfc3339(), "2023-05-25T20:38:57+00:00");
    }
}
