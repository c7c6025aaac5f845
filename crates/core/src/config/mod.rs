//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::worker::WorkerConfig;

mod validation;

pub use validation::ConfigError;

/// Cache generation shipped with this build.
pub const DEFAULT_CACHE_NAME: &str = "budget-pwa-v1";

/// Core assets precached at install, relative to the scope.
pub const DEFAULT_PRECACHE: &[&str] =
    &["./", "./index.html", "./manifest.webmanifest", "./icons/icon-192.png", "./icons/icon-512.png"];

/// Document every navigation resolves to.
pub const DEFAULT_ENTRY_DOCUMENT: &str = "./index.html";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the current cache generation.
    ///
    /// Set via SWCACHE_CACHE_NAME. Changing it and reinstalling evicts
    /// every other generation on activate.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Base URL of the application. Defines the same-origin boundary and
    /// resolves relative precache paths.
    ///
    /// Set via SWCACHE_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Paths precached on install, relative to `scope`.
    ///
    /// Set via SWCACHE_PRECACHE (e.g. `["./", "./index.html"]`).
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Document served for every navigation request.
    ///
    /// Set via SWCACHE_ENTRY_DOCUMENT environment variable.
    #[serde(default = "default_entry_document")]
    pub entry_document: String,

    /// Path to SQLite cache storage database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects followed per fetch.
    ///
    /// Set via SWCACHE_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_cache_name() -> String {
    DEFAULT_CACHE_NAME.into()
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_precache() -> Vec<String> {
    DEFAULT_PRECACHE.iter().map(|p| p.to_string()).collect()
}

fn default_entry_document() -> String {
    DEFAULT_ENTRY_DOCUMENT.into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "sw-cache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            scope: default_scope(),
            precache: default_precache(),
            entry_document: default_entry_document(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed scope URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `scope` is not an absolute http(s) URL.
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.scope)
            .map_err(|e| ConfigError::Invalid { field: "scope".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "scope".into(), reason: format!("unsupported scheme: {scheme}") }),
        }
    }

    /// Build the worker configuration handed to the interceptor.
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        self.validate()?;
        Ok(WorkerConfig {
            cache_name: self.cache_name.clone(),
            scope: self.scope_url()?,
            precache: self.precache.clone(),
            entry_document: self.entry_document.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_name, "budget-pwa-v1");
        assert_eq!(config.scope, "http://localhost:8080/");
        assert_eq!(
            config.precache,
            vec!["./", "./index.html", "./manifest.webmanifest", "./icons/icon-192.png", "./icons/icon-512.png"]
        );
        assert_eq!(config.entry_document, "./index.html");
        assert_eq!(config.db_path, PathBuf::from("./sw-cache.sqlite"));
        assert_eq!(config.user_agent, "sw-cache/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_worker_config_resolves_scope() {
        let config = AppConfig { scope: "https://budget.example/app/".into(), ..Default::default() };
        let worker = config.worker_config().unwrap();
        assert_eq!(worker.cache_name, "budget-pwa-v1");
        assert_eq!(worker.scope.as_str(), "https://budget.example/app/");
        assert_eq!(worker.precache.len(), 5);
    }

    #[test]
    fn test_load_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "sw.toml",
                r#"
                cache_name = "budget-pwa-v2"
                scope = "https://budget.example/"
                timeout_ms = 5000
                "#,
            )?;
            jail.set_env("SWCACHE_CONFIG_FILE", "sw.toml");
            jail.set_env("SWCACHE_TIMEOUT_MS", "7000");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_name, "budget-pwa-v2");
            assert_eq!(config.scope, "https://budget.example/");
            assert_eq!(config.timeout_ms, 7000);
            assert_eq!(config.precache.len(), 5);
            Ok(())
        });
    }
}
