//! Configuration loading for the Docket client.
//!
//! `api_base_url` and `request_timeout_ms` are required; every section has
//! defaults.

use docket_cache::{CacheConfig, CacheKey};
use docket_core::{ConfigError, ResourceKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "DOCKET_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: u64,
    /// Per-resource TTLs keyed by resource name (`cases`, `courts`, ...).
    #[serde(default)]
    pub ttl_ms: BTreeMap<String, u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_ms: default_ttl_ms(),
            ttl_ms: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_language() -> String {
    "ar".to_string()
}

fn default_ttl_ms() -> u64 {
    45_000
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl ClientConfig {
    /// Load from `--config <path>` or `DOCKET_CONFIG`, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(invalid("api_base_url", "must not be empty"));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(invalid("api_base_url", "must start with http:// or https://"));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "must be > 0"));
        }
        if self.language.trim().is_empty() {
            return Err(invalid("language", "must not be empty"));
        }
        if let Some(token) = &self.auth.bearer_token {
            if token.trim().is_empty() {
                return Err(invalid("auth.bearer_token", "must not be empty when set"));
            }
        }
        if self.cache.default_ttl_ms == 0 {
            return Err(invalid("cache.default_ttl_ms", "must be > 0"));
        }
        for (resource, ttl) in &self.cache.ttl_ms {
            let field = format!("cache.ttl_ms.{}", resource);
            if resource.parse::<ResourceKind>().is_err() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "unknown resource".to_string(),
                });
            }
            if *ttl == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be > 0".to_string(),
                });
            }
        }
        if let Err(e) = EnvFilter::try_new(&self.logging.filter) {
            return Err(invalid("logging.filter", &e.to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Request cache configuration with one TTL override per configured
    /// resource prefix.
    pub fn cache_config(&self) -> Result<CacheConfig, ConfigError> {
        let mut config =
            CacheConfig::new().with_default_ttl(Duration::from_millis(self.cache.default_ttl_ms));
        for (resource, ttl) in &self.cache.ttl_ms {
            let kind = resource
                .parse::<ResourceKind>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: format!("cache.ttl_ms.{}", resource),
                    reason: e.to_string(),
                })?;
            config = config.with_ttl_override(
                CacheKey::prefix(kind).into_string(),
                Duration::from_millis(*ttl),
            );
        }
        Ok(config)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
api_base_url = "https://office.example.test/api"
request_timeout_ms = 15000
language = "en"

[auth]
bearer_token = "secret-token"

[cache]
default_ttl_ms = 30000

[cache.ttl_ms]
courts = 300000
case = 10000

[logging]
filter = "docket_client=debug,info"
json = true
"#;

    #[test]
    fn test_parse_full_config() {
        let config = ClientConfig::from_toml_str(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.api_base_url, "https://office.example.test/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.language, "en");
        assert_eq!(config.auth.bearer_token.as_deref(), Some("secret-token"));
        assert!(config.logging.json);

        let cache = config.cache_config().unwrap();
        assert_eq!(cache.default_ttl, Duration::from_secs(30));
        assert_eq!(cache.ttl_for("courts:list"), Duration::from_secs(300));
        assert_eq!(cache.ttl_for("cases:7"), Duration::from_secs(10));
        assert_eq!(cache.ttl_for("clients:list"), Duration::from_secs(30));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ClientConfig::from_toml_str(
            "api_base_url = \"http://localhost:8000/api\"\nrequest_timeout_ms = 5000\n",
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.language, "ar");
        assert!(config.auth.bearer_token.is_none());
        assert_eq!(config.cache.default_ttl_ms, 45_000);
        assert_eq!(config.logging.filter, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ClientConfig::from_toml_str(
            "api_base_url = \"http://x\"\nrequest_timeout_ms = 1\nretries = 3\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_failures() {
        let base = ClientConfig::from_toml_str(FULL).unwrap();

        let mut config = base.clone();
        config.api_base_url = "office.example.test".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "api_base_url"
        ));

        let mut config = base.clone();
        config.request_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.cache.ttl_ms.insert("invoices".to_string(), 1000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "cache.ttl_ms.invoices"
        ));

        let mut config = base.clone();
        config.cache.ttl_ms.insert("lawyers".to_string(), 0);
        assert!(config.validate().is_err());

        let mut config = base;
        config.auth.bearer_token = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = ClientConfig::from_path(file.path()).unwrap();
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = ClientConfig::from_path(Path::new("/nonexistent/docket.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
