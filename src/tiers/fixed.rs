//! Fixed-response backend.

use super::{TierBackend, TierError, TierRequest};
use async_trait::async_trait;
use std::time::Duration;

/// A tier that answers every request with the same text.
///
/// Used for offline operation, demos and as a guaranteed last tier.
#[derive(Debug, Clone)]
pub struct FixedResponseBackend {
    name: String,
    response: String,
}

impl FixedResponseBackend {
    /// Creates a fixed-response tier.
    #[must_use]
    pub fn new(name: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: response.into(),
        }
    }
}

#[async_trait]
impl TierBackend for FixedResponseBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _request: &TierRequest, _timeout: Duration) -> Result<String, TierError> {
        Ok(self.response.clone())
    }

    async fn probe(&self, _timeout: Duration) -> Result<(), TierError> {
        Ok(())
    }
}
