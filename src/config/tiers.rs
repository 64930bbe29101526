//! Static backend tier configuration.

use serde::Deserialize;

/// One `[[tiers]]` entry. Declaration order is rank order.
#[derive(Debug, Clone, Deserialize)]
pub struct TierConfig {
    /// Tier name used in logs, metrics and status output.
    pub name: String,
    /// Per-tier call timeout override.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Backend variant.
    #[serde(flatten)]
    pub backend: TierBackendKind,
}

/// Backend variant, selected by the `kind` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TierBackendKind {
    /// A vision-language service reached over HTTP.
    Http {
        /// Request URL.
        endpoint: String,
        /// Model identifier forwarded to the service.
        #[serde(default)]
        model: Option<String>,
        /// Name of the environment variable holding the API key.
        #[serde(default)]
        api_key_env: Option<String>,
    },
    /// A fixed response, for offline operation and demos.
    Static {
        /// Text returned for every request.
        response: String,
    },
}

impl TierBackendKind {
    /// Returns the variant tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Static { .. } => "static",
        }
    }
}

impl TierConfig {
    /// Creates a static tier entry.
    #[must_use]
    pub fn fixed(name: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout_ms: None,
            backend: TierBackendKind::Static {
                response: response.into(),
            },
        }
    }
}
