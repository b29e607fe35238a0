//! Configuration handling for waybill.
//!
//! Settings come from a `.waybill.toml` file, overlaid by `WAYBILL_*`
//! environment variables. The result is built once into a [`Config`] and
//! passed by reference. The share base-URL override chosen at runtime is kept
//! separately in `settings.json` inside the store directory
//! ([`ShareSettings`]).
//!
//! # Example
//!
//! ```
//! use waybill_config::Config;
//!
//! let config = Config::from_toml_str(r#"
//! [rest]
//! url = "https://project.supabase.co"
//! anon_key = "anon"
//! "#).expect("parse");
//!
//! assert!(config.cloud().rest.is_complete());
//! assert_eq!(config.http.timeout_secs, 30);
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use waybill_cloud::{CloudConfig, DEFAULT_TIMEOUT_SECS, FirestoreConfig, RestConfig};

/// Default configuration file name
pub const CONFIG_FILE: &str = ".waybill.toml";

/// Share settings file name, inside the store directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Default local store directory
pub const DEFAULT_STORE_DIR: &str = ".waybill";

// Environment overlay keys
pub const ENV_REST_URL: &str = "WAYBILL_REST_URL";
pub const ENV_REST_ANON_KEY: &str = "WAYBILL_REST_ANON_KEY";
pub const ENV_REST_TABLE: &str = "WAYBILL_REST_TABLE";
pub const ENV_FIRESTORE_API_KEY: &str = "WAYBILL_FIRESTORE_API_KEY";
pub const ENV_FIRESTORE_PROJECT_ID: &str = "WAYBILL_FIRESTORE_PROJECT_ID";
pub const ENV_FIRESTORE_COLLECTION: &str = "WAYBILL_FIRESTORE_COLLECTION";
pub const ENV_FIRESTORE_ENDPOINT: &str = "WAYBILL_FIRESTORE_ENDPOINT";
pub const ENV_PUBLIC_BASE_URL: &str = "WAYBILL_PUBLIC_BASE_URL";
pub const ENV_STORE_DIR: &str = "WAYBILL_STORE_DIR";

/// Get the config file path for a directory
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Complete waybill configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Local store settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Row store provider
    #[serde(default)]
    pub rest: RestConfig,
    /// Document store provider
    #[serde(default)]
    pub firestore: FirestoreConfig,
    /// Share link settings
    #[serde(default)]
    pub share: ShareConfig,
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// Local store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding record files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Share link configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Default public base URL for links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config")
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`. Empty values count as absent.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        overlay(&mut self.rest.url, get(ENV_REST_URL));
        overlay(&mut self.rest.anon_key, get(ENV_REST_ANON_KEY));
        overlay(&mut self.rest.table, get(ENV_REST_TABLE));
        overlay(&mut self.firestore.api_key, get(ENV_FIRESTORE_API_KEY));
        overlay(&mut self.firestore.project_id, get(ENV_FIRESTORE_PROJECT_ID));
        overlay(&mut self.firestore.collection, get(ENV_FIRESTORE_COLLECTION));
        overlay(&mut self.firestore.endpoint, get(ENV_FIRESTORE_ENDPOINT));
        overlay(&mut self.share.public_base_url, get(ENV_PUBLIC_BASE_URL));
        if let Some(dir) = get(ENV_STORE_DIR) {
            self.store.dir = Some(PathBuf::from(dir));
        }
    }

    /// Local store directory
    pub fn store_dir(&self) -> PathBuf {
        self.store
            .dir
            .clone()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR))
    }

    /// Cloud settings for building the gateway
    pub fn cloud(&self) -> CloudConfig {
        CloudConfig {
            rest: self.rest.clone(),
            firestore: self.firestore.clone(),
            timeout_secs: self.http.timeout_secs,
        }
    }

    /// Configured default base URL for share links
    pub fn public_base_url(&self) -> Option<&str> {
        self.share
            .public_base_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

fn overlay(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Load configuration from a directory
pub fn load_config(dir: &Path) -> Result<Config> {
    load_config_file(&config_path(dir))
}

/// Load configuration from a specific file path. A missing file yields the
/// defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Persisted share preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSettings {
    /// Base URL override for share links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

impl ShareSettings {
    /// Set the base URL override. Blank values are rejected.
    pub fn set_public_base_url(&mut self, url: &str) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            bail!("public base URL must not be empty");
        }
        self.public_base_url = Some(url.to_string());
        Ok(())
    }

    /// Remove the base URL override
    pub fn clear_public_base_url(&mut self) {
        self.public_base_url = None;
    }

    /// The override, if set and non-blank
    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Get the settings file path for a store directory
pub fn settings_path(store_dir: &Path) -> PathBuf {
    store_dir.join(SETTINGS_FILE)
}

/// Load share settings. A missing file yields the defaults.
pub fn load_settings(store_dir: &Path) -> Result<ShareSettings> {
    let path = settings_path(store_dir);
    if !path.exists() {
        return Ok(ShareSettings::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse settings file: {}", path.display()))
}

/// Save share settings, creating the store directory if needed
pub fn save_settings(store_dir: &Path, settings: &ShareSettings) -> Result<()> {
    std::fs::create_dir_all(store_dir)
        .with_context(|| format!("failed to create store dir: {}", store_dir.display()))?;

    let path = settings_path(store_dir);
    let content =
        serde_json::to_string_pretty(settings).context("failed to serialize settings")?;

    std::fs::write(&path, content)
        .with_context(|| format!("failed to write settings file: {}", path.display()))?;

    Ok(())
}

/// Mask a secret for display, keeping at most four characters on each end
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}
