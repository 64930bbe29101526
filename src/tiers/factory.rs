//! Builds backend tiers from configuration.

use super::{FixedResponseBackend, HttpTierBackend, TierBackend, TierSpec};
use crate::config::{TierBackendKind, TierConfig};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builds the ranked tier list from `[[tiers]]` entries.
///
/// An HTTP tier whose API key variable is unset is still built, without
/// credentials; the backend will answer unauthorized and the executor will
/// mark the tier failed.
///
/// # Errors
///
/// Returns an error if no tiers are configured.
pub fn build_tier_backends(tiers: &[TierConfig]) -> Result<Vec<TierSpec>> {
    if tiers.is_empty() {
        return Err(Error::InvalidInput(
            "no [[tiers]] configured for deep analysis".to_string(),
        ));
    }

    let specs = tiers
        .iter()
        .map(|tier| {
            let backend: Arc<dyn TierBackend> = match &tier.backend {
                TierBackendKind::Http {
                    endpoint,
                    model,
                    api_key_env,
                } => {
                    let mut backend = HttpTierBackend::new(&tier.name, endpoint);
                    if let Some(model) = model {
                        backend = backend.with_model(model);
                    }
                    if let Some(var) = api_key_env {
                        match std::env::var(var) {
                            Ok(key) if !key.is_empty() => backend = backend.with_api_key(key),
                            _ => tracing::warn!(
                                tier = %tier.name,
                                variable = %var,
                                "API key variable not set"
                            ),
                        }
                    }
                    Arc::new(backend)
                },
                TierBackendKind::Static { response } => {
                    Arc::new(FixedResponseBackend::new(&tier.name, response))
                },
            };
            tracing::debug!(tier = %tier.name, kind = tier.backend.kind(), "Configured tier");
            TierSpec {
                backend,
                timeout: tier.timeout_ms.map(Duration::from_millis),
            }
        })
        .collect();
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_in_rank_order() {
        let tiers = vec![
            TierConfig {
                name: "cloud".to_string(),
                timeout_ms: Some(1_500),
                backend: TierBackendKind::Http {
                    endpoint: "http://localhost:9/analyze".to_string(),
                    model: Some("vlm".to_string()),
                    api_key_env: Some("SIGHTLINE_TEST_UNSET_KEY".to_string()),
                },
            },
            TierConfig::fixed("offline", "I can't reach the analysis service."),
        ];
        let specs = build_tier_backends(&tiers).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].backend.name(), "cloud");
        assert_eq!(specs[0].timeout, Some(Duration::from_millis(1_500)));
        assert_eq!(specs[1].backend.name(), "offline");
        assert_eq!(specs[1].timeout, None);
    }

    #[test]
    fn test_rejects_empty() {
        assert!(build_tier_backends(&[]).is_err());
    }
}
