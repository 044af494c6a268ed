//! Top-level application configuration.
//!
//! Configuration is stored in `config.yaml` (see `paths::config_path`) and includes:
//! - The backend base URL, bearer token and page size
//! - Query timing: debounce interval, search fan-out and cache freshness
//! - Resource overrides and additional resources

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LeadboardError, Result};
use crate::paths;
use crate::resource::ResourceSpec;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Query timing and fan-out settings
    #[serde(default, skip_serializing_if = "QuerySettings::is_default")]
    pub query: QuerySettings,

    /// Resource definitions keyed by name, overriding the built-in presets
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceSpec>,
}

/// Backend connection settings
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Items per backend page, used to derive page counts from `count`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Query timing and fan-out settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySettings {
    /// Quiet interval before search input is promoted (default: 500)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Pages fetched in parallel for search and filter options (default: 3)
    #[serde(default = "default_search_pages")]
    pub search_pages: u32,

    /// Fan out over every known page instead of the fixed count
    #[serde(default)]
    pub search_all_known_pages: bool,

    /// Upper bound on fan-out when all known pages are searched (default: 10)
    #[serde(default = "default_max_search_pages")]
    pub max_search_pages: u32,

    #[serde(default = "default_page_fresh_secs")]
    pub page_fresh_secs: u64,

    #[serde(default = "default_search_fresh_secs")]
    pub search_fresh_secs: u64,

    #[serde(default = "default_options_fresh_secs")]
    pub options_fresh_secs: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_search_pages() -> u32 {
    3
}

fn default_max_search_pages() -> u32 {
    10
}

fn default_page_fresh_secs() -> u64 {
    30
}

fn default_search_fresh_secs() -> u64 {
    30
}

fn default_options_fresh_secs() -> u64 {
    300
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            search_pages: default_search_pages(),
            search_all_known_pages: false,
            max_search_pages: default_max_search_pages(),
            page_fresh_secs: default_page_fresh_secs(),
            search_fresh_secs: default_search_fresh_secs(),
            options_fresh_secs: default_options_fresh_secs(),
        }
    }
}

impl QuerySettings {
    /// Check if this config has default values
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn page_fresh(&self) -> Duration {
        Duration::from_secs(self.page_fresh_secs)
    }

    pub fn search_fresh(&self) -> Duration {
        Duration::from_secs(self.search_fresh_secs)
    }

    pub fn options_fresh(&self) -> Duration {
        Duration::from_secs(self.options_fresh_secs)
    }
}

/// Keys accepted by `Config::set`.
pub const SETTABLE_KEYS: &[&str] = &[
    "api.base_url",
    "api.token",
    "api.page_size",
    "query.debounce_ms",
    "query.search_pages",
    "query.search_all_known_pages",
    "query.max_search_pages",
    "query.page_fresh_secs",
    "query.search_fresh_secs",
    "query.options_fresh_secs",
];

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        LeadboardError::Config(format!("invalid value '{value}' for '{key}'"))
    })
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        paths::config_path()
    }

    /// Load configuration from the resolved path, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            LeadboardError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        for (name, spec) in &config.resources {
            if name != &spec.name {
                return Err(LeadboardError::Config(format!(
                    "resource key '{}' does not match its name '{}'",
                    name, spec.name
                )));
            }
            spec.validate()?;
        }
        Ok(config)
    }

    /// Save configuration to the resolved path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                LeadboardError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory for config at {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).map_err(|e| {
            LeadboardError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;

        // The file may hold a bearer token: owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, permissions)?;
        }

        Ok(())
    }

    /// Backend base URL from environment or config file
    pub fn base_url(&self) -> Result<Url> {
        let raw = env::var("LEADBOARD_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.api.base_url.clone())
            .ok_or_else(|| {
                LeadboardError::Config(
                    "no API base URL configured (set api.base_url or LEADBOARD_BASE_URL)"
                        .to_string(),
                )
            })?;

        // Without a trailing slash `Url::join` would drop the last segment
        let normalized = if raw.ends_with('/') {
            raw
        } else {
            format!("{raw}/")
        };
        let url = Url::parse(&normalized)?;
        if url.cannot_be_a_base() {
            return Err(LeadboardError::Config(format!(
                "'{url}' cannot be used as a base URL"
            )));
        }
        Ok(url)
    }

    /// Bearer token from environment or config file
    pub fn token(&self) -> Option<String> {
        if let Ok(token) = env::var("LEADBOARD_TOKEN")
            && !token.is_empty()
        {
            return Some(token);
        }

        self.api.token.clone().filter(|t| !t.is_empty())
    }

    /// Look up a resource, configured definitions first, then built-in presets.
    pub fn resource(&self, name: &str) -> Result<ResourceSpec> {
        if let Some(spec) = self.resources.get(name) {
            return Ok(spec.clone());
        }
        ResourceSpec::builtins()
            .remove(name)
            .ok_or_else(|| LeadboardError::UnknownResource(name.to_string()))
    }

    /// All known resources, configured definitions replacing presets.
    pub fn all_resources(&self) -> BTreeMap<String, ResourceSpec> {
        let mut all = ResourceSpec::builtins();
        all.extend(self.resources.clone());
        all
    }

    /// Debounce interval for a resource, honoring its override.
    pub fn debounce_for(&self, spec: &ResourceSpec) -> Duration {
        spec.debounce_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.query.debounce())
    }

    /// Set a value by dotted key, e.g. `query.debounce_ms`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.base_url" => {
                if let Some(url) = optional(value) {
                    Url::parse(&url)?;
                    self.api.base_url = Some(url);
                } else {
                    self.api.base_url = None;
                }
            }
            "api.token" => self.api.token = optional(value),
            "api.page_size" => {
                self.api.page_size = match optional(value) {
                    Some(v) => Some(parse_value(key, &v)?),
                    None => None,
                }
            }
            "query.debounce_ms" => self.query.debounce_ms = parse_value(key, value)?,
            "query.search_pages" => {
                let pages: u32 = parse_value(key, value)?;
                if pages == 0 {
                    return Err(LeadboardError::Config(
                        "query.search_pages must be at least 1".to_string(),
                    ));
                }
                self.query.search_pages = pages;
            }
            "query.search_all_known_pages" => {
                self.query.search_all_known_pages = parse_value(key, value)?
            }
            "query.max_search_pages" => self.query.max_search_pages = parse_value(key, value)?,
            "query.page_fresh_secs" => self.query.page_fresh_secs = parse_value(key, value)?,
            "query.search_fresh_secs" => self.query.search_fresh_secs = parse_value(key, value)?,
            "query.options_fresh_secs" => {
                self.query.options_fresh_secs = parse_value(key, value)?
            }
            _ => {
                return Err(LeadboardError::Config(format!(
                    "unknown config key '{}', valid keys: {}",
                    key,
                    SETTABLE_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Read a value by dotted key. The token is always redacted.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "api.base_url" => self.api.base_url.clone(),
            "api.token" => self.api.token.as_ref().map(|_| "[REDACTED]".to_string()),
            "api.page_size" => self.api.page_size.map(|v| v.to_string()),
            "query.debounce_ms" => Some(self.query.debounce_ms.to_string()),
            "query.search_pages" => Some(self.query.search_pages.to_string()),
            "query.search_all_known_pages" => {
                Some(self.query.search_all_known_pages.to_string())
            }
            "query.max_search_pages" => Some(self.query.max_search_pages.to_string()),
            "query.page_fresh_secs" => Some(self.query.page_fresh_secs.to_string()),
            "query.search_fresh_secs" => Some(self.query.search_fresh_secs.to_string()),
            "query.options_fresh_secs" => Some(self.query.options_fresh_secs.to_string()),
            _ => {
                return Err(LeadboardError::Config(format!(
                    "unknown config key '{key}'"
                )));
            }
        };
        Ok(value)
    }

    /// YAML rendering for display, with the token redacted.
    pub fn to_redacted_yaml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.api.token.is_some() {
            shown.api.token = Some("[REDACTED]".to_string());
        }
        Ok(serde_yaml_ng::to_string(&shown)?)
    }
}
