//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses a format name; unknown names fall back to pretty output.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub filter: String,
    /// Optional log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: Self::DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Filter used when nothing else is configured.
    pub const DEFAULT_FILTER: &'static str = "warn";

    /// Builds logging configuration from config settings with env overrides.
    ///
    /// Precedence for the filter: `--verbose`, then `SIGHTLINE_LOG_LEVEL`,
    /// then `RUST_LOG`, then the config file, then the default.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let mut config = Self::default();

        if let Some(settings) = settings {
            if let Some(format) = settings.format.as_deref() {
                config.format = LogFormat::parse(format);
            }
            if let Some(level) = settings.level.as_deref() {
                config.filter = level.to_string();
            }
            if let Some(file) = settings.file.as_deref() {
                config.file = Some(crate::config::expand_home(file));
            }
        }

        if let Ok(filter) = std::env::var("RUST_LOG")
            && !filter.trim().is_empty()
        {
            config.filter = filter;
        }
        if let Ok(level) = std::env::var("SIGHTLINE_LOG_LEVEL")
            && !level.trim().is_empty()
        {
            config.filter = level;
        }
        if let Ok(format) = std::env::var("SIGHTLINE_LOG_FORMAT") {
            config.format = LogFormat::parse(&format);
        }
        if let Ok(file) = std::env::var("SIGHTLINE_LOG_FILE")
            && !file.trim().is_empty()
        {
            config.file = Some(crate::config::expand_home(&file));
        }
        if verbose {
            config.filter = "sightline=debug,info".to_string();
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Pretty);
    }

    #[test]
    fn test_verbose_wins() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            level: Some("error".to_string()),
            file: None,
        };
        let config = LoggingConfig::from_settings(Some(&settings), true);
        assert_eq!(config.filter, "sightline=debug,info");
        assert_eq!(config.format, LogFormat::Json);
    }
}
