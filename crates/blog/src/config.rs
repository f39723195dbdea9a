//! Site configuration
//!
//! Loaded from (in order of priority):
//! 1. The JSON file named by `QUILL_CONFIG`
//! 2. `quill.json` in the Quill config directory
//! 3. Built-in defaults
//!
//! Environment variables are applied on top of whichever source was used.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Config filename in the Quill config directory
const CONFIG_FILE: &str = "quill.json";

/// Environment variable naming an explicit config file
const CONFIG_ENV: &str = "QUILL_CONFIG";

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_source() -> String {
    "Cluster0".to_string()
}

fn default_database() -> String {
    "blog-app".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_fallback_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("public/uploads")
}

fn default_url_prefix() -> String {
    "/uploads".to_string()
}

fn default_image() -> String {
    "/blog_pic_1.png".to_string()
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which primary document store to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PrimaryConfig {
    /// Remote document database over HTTP
    Http {
        url: String,
        api_key: String,
        #[serde(default = "default_data_source")]
        data_source: String,
        #[serde(default = "default_database")]
        database: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// Embedded SQLite database
    Sqlite { path: PathBuf },
    /// Process-local store, lost on restart
    Memory,
    /// No primary store; everything goes to the local record files
    Offline,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        PrimaryConfig::Offline
    }
}

/// Local record file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Directory holding `local-blogs.json` and `local-emails.json`
    #[serde(default = "default_fallback_dir")]
    pub dir: PathBuf,
    /// Write the files to disk; when false records live only in memory
    #[serde(default = "default_true")]
    pub persist: bool,
    /// Start the blog file with sample posts when it doesn't exist
    ///
    /// Unset means only when there is no primary store to publish to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_samples: Option<bool>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            dir: default_fallback_dir(),
            persist: true,
            seed_samples: None,
        }
    }
}

impl FallbackConfig {
    pub fn blogs_path(&self) -> PathBuf {
        self.dir.join("local-blogs.json")
    }

    pub fn emails_path(&self) -> PathBuf {
        self.dir.join("local-emails.json")
    }
}

/// Where uploaded images go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Files in a served directory
    #[default]
    Directory,
    /// `data:` URIs stored on the post
    Inline,
}

/// Image upload settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(default)]
    pub kind: AssetKind,
    #[serde(default = "default_asset_root")]
    pub root: PathBuf,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Image used when an upload can't be stored
    #[serde(default = "default_image")]
    pub default_image: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            kind: AssetKind::default(),
            root: default_asset_root(),
            url_prefix: default_url_prefix(),
            default_image: default_image(),
        }
    }
}

/// Identity provider choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    Firebase,
    Memory,
    #[default]
    Disabled,
}

/// Admin authentication settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub provider: AuthProviderKind,
    /// Firebase web API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Require a signed-in session for admin endpoints
    #[serde(default)]
    pub protect_admin: bool,
    /// Session lifetime when the provider doesn't report one (default 60)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_minutes: Option<u32>,
}

impl AuthConfig {
    pub fn session_age(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.session_minutes.unwrap_or(60)))
    }
}

/// Complete Quill configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub primary: PrimaryConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl SiteConfig {
    /// Load configuration using the following priority:
    /// 1. File named by `QUILL_CONFIG`
    /// 2. ~/.config/quill/quill.json
    /// 3. Defaults
    ///
    /// Environment overrides are applied last.
    pub fn load() -> Result<Self> {
        let mut config = if let Ok(path) = std::env::var(CONFIG_ENV) {
            info!("Loading config from {}", path);
            Self::from_file(Path::new(&path))?
        } else if config::config_exists(CONFIG_FILE) {
            info!("Loading config from the Quill config directory");
            config::load_json(CONFIG_FILE)?
        } else {
            info!("No config file found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse config JSON")
    }

    /// Get the default config file path (~/.config/quill/quill.json)
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }

    /// Whether a fresh local blog file starts with the sample posts
    ///
    /// Samples live in the local file and are merged into every listing, so
    /// by default they are only used with the offline primary.
    pub fn seeds_samples(&self) -> bool {
        self.fallback
            .seed_samples
            .unwrap_or(self.primary == PrimaryConfig::Offline)
    }

    /// Write this configuration to ~/.config/quill/quill.json
    pub fn save(&self) -> Result<PathBuf> {
        config::save_json(CONFIG_FILE, self)?;
        Self::default_config_path().context("Could not determine config directory")
    }

    /// Whether `load` would read a file rather than use defaults
    pub fn file_configured() -> bool {
        std::env::var_os(CONFIG_ENV).is_some() || config::config_exists(CONFIG_FILE)
    }

    /// Apply overrides looked up by variable name
    ///
    /// - `PORT`: listener port
    /// - `QUILL_PRIMARY_URL` + `QUILL_PRIMARY_API_KEY`: HTTP document store
    /// - `QUILL_PRIMARY_SQLITE`: SQLite document store path
    /// - `FIREBASE_API_KEY`: enables Firebase authentication
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!("Invalid PORT value {:?}: {}", port, e),
            }
        }

        if let Some(url) = lookup("QUILL_PRIMARY_URL") {
            match lookup("QUILL_PRIMARY_API_KEY") {
                Some(api_key) => {
                    self.primary = PrimaryConfig::Http {
                        url,
                        api_key,
                        data_source: default_data_source(),
                        database: default_database(),
                        timeout_ms: default_timeout_ms(),
                    }
                }
                None => warn!("QUILL_PRIMARY_URL set without QUILL_PRIMARY_API_KEY, ignoring"),
            }
        } else if let Some(path) = lookup("QUILL_PRIMARY_SQLITE") {
            self.primary = PrimaryConfig::Sqlite { path: path.into() };
        }

        if let Some(api_key) = lookup("FIREBASE_API_KEY").filter(|k| !k.is_empty()) {
            self.auth.provider = AuthProviderKind::Firebase;
            self.auth.api_key = Some(api_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SiteConfig::from_json("{}").unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.server.address(), "0.0.0.0:3000");
        assert_eq!(config.primary, PrimaryConfig::Offline);
        assert!(config.fallback.persist);
        assert_eq!(config.fallback.blogs_path(), PathBuf::from("./local-blogs.json"));
        assert_eq!(config.assets.kind, AssetKind::Directory);
        assert_eq!(config.auth.provider, AuthProviderKind::Disabled);
    }

    #[test]
    fn test_parse_http_primary() {
        let json = r#"{
            "server": { "port": 8080 },
            "primary": {
                "kind": "http",
                "url": "https://data.example.com/app/v1",
                "api_key": "secret"
            },
            "fallback": { "dir": "/tmp/quill", "persist": false },
            "assets": { "kind": "inline" },
            "auth": { "provider": "memory", "protect_admin": true }
        }"#;

        let config = SiteConfig::from_json(json).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        match config.primary {
            PrimaryConfig::Http {
                ref database,
                timeout_ms,
                ..
            } => {
                assert_eq!(database, "blog-app");
                assert_eq!(timeout_ms, 10_000);
            }
            ref other => panic!("unexpected primary: {:?}", other),
        }
        assert!(!config.fallback.persist);
        assert_eq!(config.fallback.seed_samples, None);
        assert!(!config.seeds_samples());
        assert_eq!(config.assets.kind, AssetKind::Inline);
        assert!(config.auth.protect_admin);
    }

    #[test]
    fn test_parse_sqlite_primary() {
        let json = r#"{"primary": {"kind": "sqlite", "path": "quill.db"}}"#;
        let config = SiteConfig::from_json(json).unwrap();
        assert_eq!(
            config.primary,
            PrimaryConfig::Sqlite {
                path: PathBuf::from("quill.db")
            }
        );
    }

    #[test]
    fn test_invalid_kind() {
        assert!(SiteConfig::from_json(r#"{"primary": {"kind": "cassandra"}}"#).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(lookup(&[
            ("PORT", "8081"),
            ("QUILL_PRIMARY_URL", "https://data.example.com"),
            ("QUILL_PRIMARY_API_KEY", "k"),
            ("FIREBASE_API_KEY", "fb"),
        ]));

        assert_eq!(config.server.port, 8081);
        assert!(matches!(config.primary, PrimaryConfig::Http { .. }));
        assert_eq!(config.auth.provider, AuthProviderKind::Firebase);
        assert_eq!(config.auth.api_key.as_deref(), Some("fb"));
    }

    #[test]
    fn test_bad_overrides_ignored() {
        let mut config = SiteConfig::default();
        config.apply_overrides(lookup(&[
            ("PORT", "not-a-port"),
            ("QUILL_PRIMARY_URL", "https://x"),
        ]));

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.primary, PrimaryConfig::Offline);
    }

    #[test]
    fn test_samples_follow_primary() {
        let mut config = SiteConfig::default();
        assert!(config.seeds_samples());

        config.primary = PrimaryConfig::Sqlite {
            path: PathBuf::from("quill.db"),
        };
        assert!(!config.seeds_samples());

        config.fallback.seed_samples = Some(true);
        assert!(config.seeds_samples());

        config.primary = PrimaryConfig::Offline;
        config.fallback.seed_samples = Some(false);
        assert!(!config.seeds_samples());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = SiteConfig::default();
        config.primary = PrimaryConfig::Sqlite {
            path: PathBuf::from("data/quill.db"),
        };
        config.auth.provider = AuthProviderKind::Memory;

        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SiteConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_sqlite_override() {
        let mut config = SiteConfig::default();
        config.apply_overrides(lookup(&[("QUILL_PRIMARY_SQLITE", "/var/lib/quill.db")]));
        assert!(matches!(config.primary, PrimaryConfig::Sqlite { .. }));
    }
}
