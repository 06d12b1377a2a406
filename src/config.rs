use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub criteria: CriteriaConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Root of the local atomics checkout, i.e. the directory holding the
    /// per-technique folders and the Indexes CSVs.
    #[serde(default = "default_atomics_dir")]
    pub atomics_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriteriaConfig {
    /// Platform directories listed from the criteria repository, in order.
    /// Order matters: later listings overwrite earlier ones on overlap.
    #[serde(default = "default_criteria_paths")]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_audit_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub atomics_dir: Option<String>,
    pub token: Option<String>,
    pub criteria_paths: Option<Vec<String>>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/atomic-drift/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(atomics_dir) = overrides.atomics_dir {
            self.local.atomics_dir = atomics_dir;
        }
        if let Some(token) = overrides.token {
            self.github.token = token;
        }
        if let Some(paths) = overrides.criteria_paths {
            self.criteria.paths = paths;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_atomics_dir(&self) -> PathBuf {
        expand_tilde(&self.local.atomics_dir)
    }

    pub fn resolved_audit_dir(&self) -> Option<PathBuf> {
        self.audit.enabled.then(|| expand_tilde(&self.audit.dir))
    }

    pub fn token(&self) -> Option<String> {
        let trimmed = self.github.token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn default_template() -> String {
        let template = r#"[local]
atomics_dir = "../atomic-red-team/atomics"

[github]
api_base = "https://api.github.com"
token = ""

[criteria]
paths = ["windows", "macos"]

[audit]
enabled = false
dir = "~/.local/share/atomic-drift/audit"
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            atomics_dir: default_atomics_dir(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: String::new(),
        }
    }
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            paths: default_criteria_paths(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_audit_dir(),
        }
    }
}

fn default_atomics_dir() -> String {
    "../atomic-red-team/atomics".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_criteria_paths() -> Vec<String> {
    vec!["windows".to_string(), "macos".to_string()]
}

fn default_audit_dir() -> String {
    "~/.local/share/atomic-drift/audit".to_string()
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn template_round_trips_through_toml() {
        let parsed: Config =
            toml::from_str(&Config::default_template()).expect("template failed to parse");
        assert_eq!(parsed.criteria.paths, vec!["windows", "macos"]);
        assert!(!parsed.audit.enabled);
        assert!(parsed.token().is_none());
    }
}
