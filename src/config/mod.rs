//! Configuration management for stockwatch.
//!
//! Configuration is read from `~/.config/stockwatch/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! Secrets and deployment knobs can then be overridden from the environment.

use crate::source::{BrowserSettings, CatalogSettings};
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreSettings,
    pub catalog: CatalogSettings,
    pub fetch: FetchSettings,
    pub browser: BrowserSettings,
    pub state: StateSettings,
    pub notify: NotifySettings,
}

/// Which store the catalog is checked for
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Delivery pincode used to select the store (default: 110001)
    pub pincode: Option<String>,

    /// Store name used to key the snapshot (default: delhi)
    pub default_store: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            pincode: Some("110001".to_string()),
            default_store: "delhi".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Parallel detail fetches (default: 12)
    pub max_workers: usize,

    /// Timeout for one detail fetch in seconds (default: 30)
    pub request_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_workers: crate::fetcher::DEFAULT_WORKERS,
            request_timeout_secs: 30,
        }
    }
}

impl FetchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateSettings {
    /// Snapshot database (default: <data dir>/stockwatch/state.db)
    pub db_path: Option<PathBuf>,

    /// Last-fetch heartbeat file (default: <data dir>/stockwatch/last_fetch)
    pub heartbeat_path: Option<PathBuf>,

    /// Prefix for snapshot keys (default: "amul:")
    pub key_prefix: String,

    /// Days a snapshot survives without being rewritten (default: 7)
    pub retention_days: u64,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            db_path: None,
            heartbeat_path: None,
            key_prefix: crate::state::DEFAULT_KEY_PREFIX.to_string(),
            retention_days: 7,
        }
    }
}

impl StateSettings {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }

    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("state.db")),
        }
    }

    pub fn heartbeat_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.heartbeat_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("last_fetch")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    /// Telegram bot token; without it notifications are only previewed
    pub bot_token: Option<String>,

    /// Telegram channel or chat id
    pub channel_id: Option<String>,

    /// Timeout for the Telegram API call in seconds (default: 10)
    pub timeout_secs: u64,

    /// Always send the full status report (default: false)
    pub force_notify: bool,

    /// Extra line appended below the message separator
    pub footer: Option<String>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_id: None,
            timeout_secs: 10,
            force_notify: false,
            footer: None,
        }
    }
}

impl NotifySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating it when missing.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/stockwatch/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("stockwatch").join("config.toml"))
    }

    /// Apply environment overrides.
    ///
    /// `lookup` resolves a variable name; pass `|k| std::env::var(k).ok()`
    /// for the process environment. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.notify.bot_token = Some(token);
        }
        if let Some(channel) = get("TELEGRAM_CHANNEL_ID") {
            self.notify.channel_id = Some(channel);
        }
        if let Some(pincode) = get("PINCODE") {
            self.store.pincode = Some(pincode.trim().to_string());
        }
        if let Some(store) = get("DEFAULT_STORE") {
            self.store.default_store = store.trim().to_string();
        }
        if let Some(value) = get("REQUEST_TIMEOUT") {
            let secs: f64 = parse_env("REQUEST_TIMEOUT", &value)?;
            self.fetch.request_timeout_secs = secs.ceil().max(1.0) as u64;
        }
        if let Some(value) = get("FORCE_NOTIFY") {
            self.notify.force_notify = parse_bool("FORCE_NOTIFY", &value)?;
        }
        if let Some(value) = get("MAX_WORKERS") {
            self.fetch.max_workers = parse_env("MAX_WORKERS", &value)?;
        }
        if let Some(path) = get("STOCKWATCH_DB") {
            self.state.db_path = Some(PathBuf::from(path));
        }
        if let Some(prefix) = get("STATE_KEY_PREFIX") {
            self.state.key_prefix = prefix;
        }

        Ok(())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# stockwatch configuration
#
# Environment variables override these values:
#   TELEGRAM_BOT_TOKEN, TELEGRAM_CHANNEL_ID, PINCODE, DEFAULT_STORE,
#   REQUEST_TIMEOUT, FORCE_NOTIFY, MAX_WORKERS, STOCKWATCH_DB, STATE_KEY_PREFIX

[store]
# Delivery pincode used to pick the store
pincode = "110001"

# Store name the availability snapshot is kept under
default_store = "delhi"

[catalog]
# Storefront origin
base_url = "https://shop.amul.com"

# Category whose products are watched
category = "protein"

# Prefix for product links in notifications
product_base_url = "https://shop.amul.com/product"

[fetch]
# Parallel detail fetches (one browser per worker with the chrome source)
max_workers = 12

# Timeout for a single product detail fetch in seconds
request_timeout_secs = 30

[browser]
# Run Chrome without a visible window
headless = true

# Wait after loading the category page before reading network traffic (ms)
wait_after_load_ms = 2000

# Wait after loading a product page before reading network traffic (ms)
detail_wait_ms = 800

# Timeout for store selection elements to appear in seconds
element_timeout_secs = 10

[state]
# Prefix for snapshot keys
key_prefix = "amul:"

# Days a snapshot is kept without being rewritten
retention_days = 7

# db_path = "/var/lib/stockwatch/state.db"
# heartbeat_path = "/var/lib/stockwatch/last_fetch"

[notify]
# Telegram credentials; without them notifications are printed instead
# bot_token = ""
# channel_id = ""

# Telegram API timeout in seconds
timeout_secs = 10

# Always send the full status report instead of only new products
force_notify = false

# footer = "Happy shopping!"
"##
        .to_string()
    }
}

fn data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    let dir = data_dir.join("stockwatch");
    fs::create_dir_all(&dir).map_err(|e| ConfigError::Io {
        path: dir.clone(),
        source: e,
    })?;
    Ok(dir)
}

fn parse_env<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Env {
            var,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value {value:?} for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.store.pincode.as_deref(), Some("110001"));
        assert_eq!(config.store.default_store, "delhi");
        assert_eq!(config.fetch.max_workers, 12);
        assert_eq!(config.state.key_prefix, "amul:");
        assert_eq!(config.state.retention(), Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(config.catalog.category, "protein");
        assert!(config.browser.headless);
        assert!(config.notify.bot_token.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[catalog]
category = "paneer"

[fetch]
max_workers = 4
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        // Custom value
        assert_eq!(config.catalog.category, "paneer");
        assert_eq!(config.fetch.max_workers, 4);
        // Default value
        assert_eq!(config.catalog.base_url, "https://shop.amul.com");
        assert_eq!(config.fetch.request_timeout_secs, 30);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");

        assert_eq!(config.store.default_store, "delhi");
        assert_eq!(config.notify.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stockwatch").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.fetch.max_workers, 12);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.state.key_prefix, "amul:");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fetch]\nmax_workers = \"many\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("TELEGRAM_BOT_TOKEN", "123:abc"),
                ("TELEGRAM_CHANNEL_ID", "@stock"),
                ("PINCODE", " 400001 "),
                ("DEFAULT_STORE", "mumbai"),
                ("REQUEST_TIMEOUT", "2.5"),
                ("FORCE_NOTIFY", "True"),
                ("MAX_WORKERS", "3"),
                ("STOCKWATCH_DB", "/tmp/state.db"),
                ("STATE_KEY_PREFIX", "test:"),
            ]))
            .unwrap();

        assert_eq!(config.notify.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.notify.channel_id.as_deref(), Some("@stock"));
        assert_eq!(config.store.pincode.as_deref(), Some("400001"));
        assert_eq!(config.store.default_store, "mumbai");
        assert_eq!(config.fetch.request_timeout_secs, 3);
        assert!(config.notify.force_notify);
        assert_eq!(config.fetch.max_workers, 3);
        assert_eq!(config.state.db_path, Some(PathBuf::from("/tmp/state.db")));
        assert_eq!(config.state.key_prefix, "test:");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("PINCODE", "  "), ("MAX_WORKERS", "")]))
            .unwrap();

        assert_eq!(config.store.pincode.as_deref(), Some("110001"));
        assert_eq!(config.fetch.max_workers, 12);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("MAX_WORKERS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "MAX_WORKERS", .. }));

        let err = config
            .apply_env(env(&[("FORCE_NOTIFY", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "FORCE_NOTIFY", .. }));
    }

    #[test]
    fn test_explicit_state_paths() {
        let state = StateSettings {
            db_path: Some(PathBuf::from("/srv/state.db")),
            heartbeat_path: Some(PathBuf::from("/srv/last_fetch")),
            ..Default::default()
        };
        assert_eq!(state.db_path().unwrap(), PathBuf::from("/srv/state.db"));
        assert_eq!(state.heartbeat_path().unwrap(), PathBuf::from("/srv/last_fetch"));
    }
}
