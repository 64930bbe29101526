//! Configuration management.
//!
//! Configuration is read from TOML into `ConfigFile` mirror structs where
//! every field is optional, then folded over the defaults of each
//! component's own config type. `SIGHTLINE_*` environment variables are
//! applied last.
//!
//! ```toml
//! [router]
//! similarity_threshold = 0.7
//!
//! [executor]
//! max_attempts = 3
//! attempt_timeout_ms = 8000
//! exhausted_cooldown_ms = 60000
//!
//! [[tiers]]
//! name = "primary"
//! kind = "http"
//! endpoint = "https://vision.example.com/v1/analyze"
//! model = "vision-large"
//! api_key_env = "SIGHTLINE_PRIMARY_API_KEY"
//!
//! [aggregator]
//! priority_labels = ["person", "car", "stairs"]
//!
//! [vocabulary]
//! capacity = 256
//! store_path = "~/.local/share/sightline/vocabulary.json"
//! ```

mod tiers;

pub use tiers::{TierBackendKind, TierConfig};

use crate::aggregation::AggregatorConfig;
use crate::routing::RouterConfig;
use crate::tiers::ExecutorConfig;
use crate::vocabulary::VocabularyConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Main configuration for sightline.
#[derive(Debug, Clone, Default)]
pub struct SightlineConfig {
    /// Intent router settings.
    pub router: RouterConfig,
    /// Tier executor settings.
    pub executor: ExecutorConfig,
    /// Ordered backend tiers; position is rank.
    pub tiers: Vec<TierConfig>,
    /// Detection aggregator settings.
    pub aggregator: AggregatorConfig,
    /// Vocabulary manager settings.
    pub vocabulary: VocabularyConfig,
    /// Observability settings.
    pub observability: ObservabilitySettings,
    /// Config files that were merged into this configuration.
    pub config_sources: Vec<PathBuf>,
}

/// Observability section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservabilitySettings {
    /// Logging settings.
    pub logging: Option<LoggingSettings>,
    /// Metrics settings.
    pub metrics: Option<MetricsSettings>,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `json` or `pretty`.
    pub format: Option<String>,
    /// Filter directive, e.g. `info` or `sightline=debug`.
    pub level: Option<String>,
    /// Optional log file path.
    pub file: Option<String>,
}

/// Metrics settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus recorder is installed.
    pub enabled: Option<bool>,
    /// Listener port.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Router section.
    pub router: Option<ConfigFileRouter>,
    /// Executor section.
    pub executor: Option<ConfigFileExecutor>,
    /// Tier list.
    #[serde(default)]
    pub tiers: Vec<TierConfig>,
    /// Aggregator section.
    pub aggregator: Option<ConfigFileAggregator>,
    /// Vocabulary section.
    pub vocabulary: Option<ConfigFileVocabulary>,
    /// Observability section.
    pub observability: Option<ObservabilitySettings>,
}

/// Router section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRouter {
    /// Minimum similarity for the fallback phase.
    pub similarity_threshold: Option<f32>,
    /// Deep-analysis trigger phrases.
    pub deep_phrases: Option<Vec<String>>,
    /// Navigation trigger phrases.
    pub navigation_phrases: Option<Vec<String>>,
    /// Fast-detection trigger phrases.
    pub fast_phrases: Option<Vec<String>>,
}

/// Executor section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileExecutor {
    /// Tries per tier on transport errors.
    pub max_attempts: Option<u32>,
    /// First backoff delay.
    pub backoff_base_ms: Option<u64>,
    /// Backoff ceiling.
    pub backoff_max_ms: Option<u64>,
    /// Per-call timeout.
    pub attempt_timeout_ms: Option<u64>,
    /// Cool-down before an exhausted tier is retried (0 = probe only).
    pub exhausted_cooldown_ms: Option<u64>,
    /// Recovery probe interval (0 = no background probing).
    pub probe_interval_ms: Option<u64>,
    /// Attempt log bound.
    pub attempt_log_capacity: Option<usize>,
}

/// Aggregator section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileAggregator {
    /// Labels always announced first.
    pub priority_labels: Option<Vec<String>>,
    /// Maximum labels named in narration.
    pub narration_limit: Option<usize>,
}

/// Vocabulary section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileVocabulary {
    /// Maximum active phrases.
    pub capacity: Option<usize>,
    /// Snapshot file location.
    pub store_path: Option<String>,
    /// Persist latency budget.
    pub persist_budget_ms: Option<u64>,
    /// Phrases never learned.
    pub stop_phrases: Option<Vec<String>>,
    /// Longest accepted phrase in words.
    pub max_phrase_words: Option<usize>,
    /// Phrases active on first start.
    pub seed: Option<Vec<String>>,
}

impl SightlineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let mut config = Self::from_toml_str(&contents)?;
        config.config_sources.push(path.to_path_buf());
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid TOML for [`ConfigFile`] or
    /// the resulting configuration is invalid.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        let config = Self::from_config_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/sightline/` on macOS)
    /// 2. XDG config dir (`~/.config/sightline/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("sightline").join("config.toml");
        if platform_config.exists() {
            match Self::load_from_file(&platform_config) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %platform_config.display(), error = %e, "Ignoring config file");
                },
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("sightline")
            .join("config.toml");
        if xdg_config.exists() {
            match Self::load_from_file(&xdg_config) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %xdg_config.display(), error = %e, "Ignoring config file");
                },
            }
        }

        Self::default()
    }

    /// Applies `SIGHTLINE_*` environment variable overrides to every section.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.router = self.router.with_env_overrides();
        self.executor = self.executor.with_env_overrides();
        self.aggregator = self.aggregator.with_env_overrides();
        self.vocabulary = self.vocabulary.with_env_overrides();
        self
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.router.similarity_threshold) {
            return Err(Error::InvalidInput(format!(
                "router.similarity_threshold must be within [0, 1], got {}",
                self.router.similarity_threshold
            )));
        }
        if self.executor.max_attempts == 0 {
            return Err(Error::InvalidInput(
                "executor.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.executor.attempt_timeout_ms == 0 {
            return Err(Error::InvalidInput(
                "executor.attempt_timeout_ms must be positive".to_string(),
            ));
        }
        if self.vocabulary.capacity == 0 {
            return Err(Error::InvalidInput(
                "vocabulary.capacity must be at least 1".to_string(),
            ));
        }
        let mut names = HashSet::new();
        for tier in &self.tiers {
            if tier.name.trim().is_empty() {
                return Err(Error::InvalidInput("tier name must not be empty".to_string()));
            }
            if !names.insert(tier.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate tier name: {}",
                    tier.name
                )));
            }
        }
        Ok(())
    }

    /// Converts a `ConfigFile` to `SightlineConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(router) = file.router {
            if let Some(v) = router.similarity_threshold {
                config.router.similarity_threshold = v;
            }
            if router.deep_phrases.is_some() {
                config.router.deep_phrases = router.deep_phrases;
            }
            if router.navigation_phrases.is_some() {
                config.router.navigation_phrases = router.navigation_phrases;
            }
            if router.fast_phrases.is_some() {
                config.router.fast_phrases = router.fast_phrases;
            }
        }
        if let Some(executor) = file.executor {
            apply_executor_section(&mut config.executor, executor);
        }
        config.tiers = file.tiers;
        if let Some(aggregator) = file.aggregator {
            if let Some(labels) = aggregator.priority_labels {
                config.aggregator.priority_labels = labels;
            }
            if let Some(limit) = aggregator.narration_limit {
                config.aggregator.narration_limit = limit.max(1);
            }
        }
        if let Some(vocabulary) = file.vocabulary {
            apply_vocabulary_section(&mut config.vocabulary, vocabulary);
        }
        if let Some(observability) = file.observability {
            config.observability = observability;
        }

        config
    }
}

fn apply_executor_section(executor: &mut ExecutorConfig, section: ConfigFileExecutor) {
    if let Some(v) = section.max_attempts {
        executor.max_attempts = v;
    }
    if let Some(v) = section.backoff_base_ms {
        executor.backoff_base_ms = v;
    }
    if let Some(v) = section.backoff_max_ms {
        executor.backoff_max_ms = v;
    }
    if let Some(v) = section.attempt_timeout_ms {
        executor.attempt_timeout_ms = v;
    }
    if let Some(v) = section.exhausted_cooldown_ms {
        executor.exhausted_cooldown_ms = v;
    }
    if let Some(v) = section.probe_interval_ms {
        executor.probe_interval_ms = v;
    }
    if let Some(v) = section.attempt_log_capacity {
        executor.attempt_log_capacity = v.max(1);
    }
}

fn apply_vocabulary_section(vocabulary: &mut VocabularyConfig, section: ConfigFileVocabulary) {
    if let Some(v) = section.capacity {
        vocabulary.capacity = v;
    }
    if let Some(path) = section.store_path {
        vocabulary.store_path = expand_home(&path);
    }
    if let Some(v) = section.persist_budget_ms {
        vocabulary.persist_budget_ms = v;
    }
    if let Some(v) = section.stop_phrases {
        vocabulary.stop_phrases = v;
    }
    if let Some(v) = section.max_phrase_words {
        vocabulary.max_phrase_words = v.max(1);
    }
    if let Some(v) = section.seed {
        vocabulary.seed = v;
    }
}

/// Expands a leading `~/` to the user's home directory.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(base_dirs) = directories::BaseDirs::new()
    {
        return base_dirs.home_dir().join(rest);
    }
    PathBuf::from(path)
}

/// Reads an environment variable and parses it, ignoring unparsable values.
pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SightlineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.tiers.is_empty());
        assert!((config.router.similarity_threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_full_file() {
        let toml = r#"
            [router]
            similarity_threshold = 0.8
            deep_phrases = ["explain"]

            [executor]
            max_attempts = 2
            exhausted_cooldown_ms = 0

            [[tiers]]
            name = "primary"
            kind = "http"
            endpoint = "http://localhost:9000/analyze"
            model = "vision-large"
            api_key_env = "PRIMARY_KEY"

            [[tiers]]
            name = "offline"
            kind = "static"
            response = "I cannot see clearly right now."

            [aggregator]
            priority_labels = ["person", "dog"]
            narration_limit = 3

            [vocabulary]
            capacity = 16
            store_path = "/tmp/vocab.json"
            seed = ["crosswalk"]

            [observability.logging]
            format = "json"
            level = "debug"
        "#;
        let config = SightlineConfig::from_toml_str(toml).unwrap();
        assert!((config.router.similarity_threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.router.deep_phrases, Some(vec!["explain".to_string()]));
        assert_eq!(config.executor.max_attempts, 2);
        assert_eq!(config.executor.exhausted_cooldown_ms, 0);
        assert_eq!(config.tiers.len(), 2);
        assert_eq!(config.tiers[0].name, "primary");
        assert!(matches!(config.tiers[0].backend, TierBackendKind::Http { .. }));
        assert!(matches!(config.tiers[1].backend, TierBackendKind::Static { .. }));
        assert_eq!(config.aggregator.priority_labels, vec!["person", "dog"]);
        assert_eq!(config.aggregator.narration_limit, 3);
        assert_eq!(config.vocabulary.capacity, 16);
        assert_eq!(config.vocabulary.store_path, PathBuf::from("/tmp/vocab.json"));
        assert_eq!(config.vocabulary.seed, vec!["crosswalk"]);
        let logging = config.observability.logging.unwrap();
        assert_eq!(logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = SightlineConfig::from_toml_str("[router]\nsimilarity_threshold = 1.5\n")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_duplicate_tier_names_rejected() {
        let toml = r#"
            [[tiers]]
            name = "a"
            kind = "static"
            response = "x"

            [[tiers]]
            name = "a"
            kind = "static"
            response = "y"
        "#;
        assert!(SightlineConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(SightlineConfig::from_toml_str("[vocabulary]\ncapacity = 0\n").is_err());
    }

    #[test]
    fn test_load_from_file_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[executor]\nmax_attempts = 5\n").unwrap();
        let config = SightlineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.executor.max_attempts, 5);
        assert_eq!(config.config_sources, vec![path]);
    }

    #[test]
    fn test_expand_home_passthrough() {
        assert_eq!(expand_home("/var/lib/x"), PathBuf::from("/var/lib/x"));
    }
}
