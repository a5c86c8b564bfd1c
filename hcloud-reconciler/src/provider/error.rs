//! Provider error types.

use std::time::Duration;

use thiserror::Error;

use super::types::ResourceId;

/// Errors returned by provider API calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with an error status.
    #[error("provider returned {status}: {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    /// Build an API error.
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether the provider reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Api { status: 404, .. })
            || matches!(self, ProviderError::Api { code, .. } if code == "not_found")
    }
}

/// Result type for provider calls.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors produced while waiting for an action to finish.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The provider finished the action with an error.
    #[error("action {id} ({command}) failed: {code}: {message}")]
    Failed {
        id: ResourceId,
        command: String,
        code: String,
        message: String,
    },

    /// The action did not finish within the allowed time.
    #[error("action {id} timed out after {timeout:?}")]
    TimedOut { id: ResourceId, timeout: Duration },

    /// Fetching the action status failed.
    #[error("polling action {id}: {source}")]
    Poll {
        id: ResourceId,
        #[source]
        source: ProviderError,
    },
}
