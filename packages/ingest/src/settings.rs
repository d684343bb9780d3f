//! Runtime settings.
//!
//! Settings are layered: the defaults embedded from
//! `settings/default.toml`, then an optional user TOML file whose keys
//! replace the defaults, then environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crime_hotspots_cache::FsCacheStore;
use crime_hotspots_incident_models::UsageKind;
use crime_hotspots_resolver::{DistanceMetric, LocationResolver, MappingScope, Vocabulary};
use crime_hotspots_source::aggregate::FailurePolicy;
use crime_hotspots_source::api::ClientConfig;
use crime_hotspots_source::rate_limit::RateLimiter;
use crime_hotspots_source::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Embedded defaults.
pub const DEFAULT_SETTINGS: &str = include_str!("../settings/default.toml");

/// Overrides `api_url`.
pub const ENV_API_URL: &str = "CRIME_HOTSPOTS_API_URL";
/// Overrides `cache_dir`.
pub const ENV_CACHE_DIR: &str = "CRIME_HOTSPOTS_CACHE_DIR";
/// Overrides `max_concurrency`.
pub const ENV_CONCURRENCY: &str = "CRIME_HOTSPOTS_CONCURRENCY";

/// Errors from loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Every tunable of a fetch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub api_url: String,
    /// Cache root; `~/.crime_hotspots_cache` when unset.
    pub cache_dir: Option<PathBuf>,
    pub max_concurrency: usize,
    pub requests_per_second: f64,
    pub burst: u32,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub window_months: u32,
    pub failure_policy: FailurePolicy,
    pub mapping_scope: MappingScope,
    pub distance_metric: DistanceMetric,
    /// Douglas-Peucker tolerance in degrees for boundary simplification.
    pub simplify_tolerance: Option<f64>,
}

impl Settings {
    /// The embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Toml`] if the embedded file is invalid.
    pub fn defaults() -> Result<Self, SettingsError> {
        Self::from_layers(None)
    }

    /// Loads defaults, the optional user file at `path`, then environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the file cannot be read or parsed, or a
    /// value is out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let user = path
            .map(|path| {
                std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .transpose()?;

        let mut settings = Self::from_layers(user.as_deref())?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;

        if let Some(path) = path {
            log::info!("Loaded settings from {}", path.display());
        }

        Ok(settings)
    }

    /// Merges `user` TOML over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Toml`] if either layer is invalid or a
    /// user key is unknown.
    pub fn from_layers(user: Option<&str>) -> Result<Self, SettingsError> {
        let mut table: toml::Table = toml::from_str(DEFAULT_SETTINGS)?;
        if let Some(user) = user {
            let overrides: toml::Table = toml::from_str(user)?;
            table.extend(overrides);
        }

        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] if a numeric override does not
    /// parse.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = lookup(ENV_CONCURRENCY) {
            self.max_concurrency = value.trim().parse().map_err(|_| SettingsError::Invalid {
                key: ENV_CONCURRENCY,
                value,
            })?;
        }
        Ok(())
    }

    /// Rejects values that would stall or break a run.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |key, value: &dyn ToString| SettingsError::Invalid {
            key,
            value: value.to_string(),
        };

        if self.max_concurrency == 0 {
            return Err(invalid("max_concurrency", &self.max_concurrency));
        }
        if !(self.requests_per_second > 0.0) {
            return Err(invalid("requests_per_second", &self.requests_per_second));
        }
        if self.burst == 0 {
            return Err(invalid("burst", &self.burst));
        }
        if self.window_months == 0 {
            return Err(invalid("window_months", &self.window_months));
        }
        if let Some(tolerance) = self.simplify_tolerance.filter(|t| !(*t >= 0.0)) {
            return Err(invalid("simplify_tolerance", &tolerance));
        }
        Ok(())
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    #[must_use]
    pub fn client_config(&self, usage: UsageKind) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            usage,
            timeout: Duration::from_secs(self.request_timeout_secs),
            retry: self.retry_policy(),
        }
    }

    #[must_use]
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.requests_per_second, self.burst)
    }

    #[must_use]
    pub fn resolver(&self) -> LocationResolver {
        LocationResolver::new(
            Vocabulary::default(),
            self.mapping_scope,
            self.distance_metric,
        )
    }

    #[must_use]
    pub fn cache_store(&self) -> FsCacheStore {
        self.cache_dir
            .as_ref()
            .map_or_else(FsCacheStore::open_default, FsCacheStore::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let settings = Settings::defaults().unwrap();
        assert_eq!(settings.api_url, "https://data.police.uk/api/");
        assert_eq!(settings.max_concurrency, 4);
        assert_eq!(settings.window_months, 36);
        assert_eq!(settings.burst, 30);
        assert_eq!(settings.failure_policy, FailurePolicy::Skip);
        assert_eq!(settings.mapping_scope, MappingScope::SameArea);
        assert_eq!(settings.distance_metric, DistanceMetric::Euclidean);
        assert!(settings.cache_dir.is_none());
        assert!(settings.simplify_tolerance.is_none());
        settings.validate().unwrap();
    }

    #[test]
    fn user_file_overrides_defaults() {
        let settings = Settings::from_layers(Some(
            r#"
            failure_policy = "abort"
            distance_metric = "haversine"
            mapping_scope = "global"
            cache_dir = "/tmp/hotspots"
            simplify_tolerance = 0.0005
            "#,
        ))
        .unwrap();

        assert_eq!(settings.failure_policy, FailurePolicy::Abort);
        assert_eq!(settings.distance_metric, DistanceMetric::Haversine);
        assert_eq!(settings.mapping_scope, MappingScope::Global);
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/tmp/hotspots")));
        assert_eq!(settings.simplify_tolerance, Some(0.0005));
        assert_eq!(settings.max_retries, 3);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Settings::from_layers(Some("max_concurency = 8")).unwrap_err();
        assert!(matches!(err, SettingsError::Toml(_)));
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(Settings::from_layers(Some(r#"failure_policy = "retry""#)).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut settings = Settings::defaults().unwrap();
        settings
            .apply_env(|key| match key {
                ENV_API_URL => Some("http://localhost:8080/".to_string()),
                ENV_CACHE_DIR => Some("/var/cache/hotspots".to_string()),
                ENV_CONCURRENCY => Some("12".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(settings.api_url, "http://localhost:8080/");
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/var/cache/hotspots")));
        assert_eq!(settings.max_concurrency, 12);
    }

    #[test]
    fn bad_env_concurrency_is_rejected() {
        let mut settings = Settings::defaults().unwrap();
        let err = settings
            .apply_env(|key| (key == ENV_CONCURRENCY).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: ENV_CONCURRENCY, .. }));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let settings = Settings::from_layers(Some("max_concurrency = 0")).unwrap();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { key: "max_concurrency", .. })
        ));
    }

    #[test]
    fn derived_configs_follow_settings() {
        let settings = Settings::from_layers(Some("retry_base_delay_ms = 250\nmax_retries = 5"))
            .unwrap();
        let retry = settings.retry_policy();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.base_delay, Duration::from_millis(250));

        let client = settings.client_config(UsageKind::StopSearch);
        assert_eq!(client.usage, UsageKind::StopSearch);
        assert_eq!(client.timeout, Duration::from_secs(120));
    }
}
