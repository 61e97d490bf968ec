use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::graph::ReconstructionStrategy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub skypath: SkypathConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct SkypathConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for SkypathConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// XRPC service settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// AppView base URL, e.g. `https://public.api.bsky.app`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of an environment variable holding a bearer token.
    /// When unset, calls are anonymous.
    #[serde(default)]
    pub auth_token_env: Option<String>,
    /// Handle or DID of the account the token belongs to. Viewer flags in
    /// neighbor pages refer to this actor.
    #[serde(default)]
    pub viewer: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            auth_token_env: None,
            viewer: None,
        }
    }
}

/// Search tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Pause after every page call, in milliseconds (0 disables pacing)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default)]
    pub reconstruction: ReconstructionStrategy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            reconstruction: ReconstructionStrategy::default(),
        }
    }
}

/// Handle directory cache
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_handle_capacity")]
    pub handle_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            handle_capacity: default_handle_capacity(),
        }
    }
}

/// What the HTTP server does when a search arrives while another one runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrentSearches {
    /// Abort the in-flight search and start the new one
    #[default]
    Cancel,
    /// Refuse the new search until the running one finishes
    Reject,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub concurrent_searches: ConcurrentSearches,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            allowed_origins: Vec::new(),
            concurrent_searches: ConcurrentSearches::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://public.api.bsky.app".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_pacing_ms() -> u64 {
    10
}

fn default_handle_capacity() -> usize {
    10_000
}

fn default_http_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in SKYPATH_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (optional)
    ///
    /// Falls back to built-in defaults when no file is found.
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config = match std::env::var("SKYPATH_CONFIG") {
            Ok(path) => Self::from_file(&PathBuf::from(path))?,
            Err(_) => {
                let local = PathBuf::from("config.toml");
                if local.exists() {
                    Self::from_file(&local)?
                } else {
                    log::debug!("No config.toml found, using defaults");
                    Config::default()
                }
            }
        };

        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.service.base_url)
            .with_context(|| format!("service.base_url is not a valid URL: {}", self.service.base_url))?;

        if self.service.timeout_secs == 0 {
            anyhow::bail!("service.timeout_secs must be greater than 0");
        }

        if let Some(env) = &self.service.auth_token_env {
            std::env::var(env).with_context(|| {
                format!(
                    "Environment variable {} not set. Set it in your .env file or remove service.auth_token_env to run anonymously.",
                    env
                )
            })?;
        }

        if self.service.viewer.is_some() && self.service.auth_token_env.is_none() {
            anyhow::bail!("service.viewer requires service.auth_token_env; viewer flags are only set on authenticated calls");
        }

        if self.cache.handle_capacity == 0 {
            anyhow::bail!("cache.handle_capacity must be greater than 0");
        }

        Ok(())
    }

    /// Bearer token for authenticated calls, if configured
    pub fn auth_token(&self) -> Option<String> {
        self.service
            .auth_token_env
            .as_ref()
            .and_then(|env| std::env::var(env).ok())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.search.pacing_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
[skypath]
log_level = "debug"

[service]
base_url = "http://127.0.0.1:9999"
timeout_secs = 5
auth_token_env = "SKYPATH_TEST_TOKEN"
viewer = "me.bsky.social"

[search]
pacing_ms = 0
reconstruction = "uniform_cost"

[http_server]
port = 9090
concurrent_searches = "reject"
"#;

    fn with_config_env(config_path: &std::path::Path, token: Option<&str>, f: impl FnOnce()) {
        let original_config = std::env::var("SKYPATH_CONFIG").ok();
        std::env::set_var("SKYPATH_CONFIG", config_path.to_str().unwrap());
        match token {
            Some(t) => std::env::set_var("SKYPATH_TEST_TOKEN", t),
            None => std::env::remove_var("SKYPATH_TEST_TOKEN"),
        }
        f();
        std::env::remove_var("SKYPATH_CONFIG");
        std::env::remove_var("SKYPATH_TEST_TOKEN");
        if let Some(val) = original_config {
            std::env::set_var("SKYPATH_CONFIG", val);
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.service.base_url, "https://public.api.bsky.app");
        assert_eq!(config.search.pacing_ms, 10);
        assert_eq!(config.search.reconstruction, ReconstructionStrategy::BreadthFirst);
        assert_eq!(config.http_server.concurrent_searches, ConcurrentSearches::Cancel);
        assert!(config.auth_token().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[search]\npacing_ms = 25\n").unwrap();
        assert_eq!(config.search.pacing_ms, 25);
        assert_eq!(config.service.timeout_secs, 30);
        assert_eq!(config.cache.handle_capacity, 10_000);
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();
        with_config_env(&config_path, Some("secret"), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.skypath.log_level, "debug");
            assert_eq!(config.pacing(), Duration::ZERO);
            assert_eq!(config.timeout(), Duration::from_secs(5));
            assert_eq!(config.search.reconstruction, ReconstructionStrategy::UniformCost);
            assert_eq!(config.http_server.concurrent_searches, ConcurrentSearches::Reject);
            assert_eq!(config.auth_token().as_deref(), Some("secret"));
            assert_eq!(config.service.viewer.as_deref(), Some("me.bsky.social"));
        });
    }

    #[test]
    fn test_config_missing_auth_token() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();
        with_config_env(&config_path, None, || {
            let config = Config::load();
            assert!(config.is_err(), "Expected missing token error");
            assert!(config.unwrap_err().to_string().contains("SKYPATH_TEST_TOKEN"));
        });
    }

    #[test]
    fn test_config_viewer_requires_token() {
        let mut config = Config::default();
        config.service.viewer = Some("me.bsky.social".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_bad_base_url() {
        let mut config = Config::default();
        config.service.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("SKYPATH_CONFIG").ok();
        std::env::set_var("SKYPATH_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("SKYPATH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("SKYPATH_CONFIG", v);
        }
    }
}
