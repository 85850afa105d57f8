use std::time::Duration;
use thiserror::Error;

/// Errors from model transport calls.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A network error occurred during the API call.
    #[error("network: {0}")]
    Network(String),

    /// The call did not complete within its deadline.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    /// The provider rejected the call for exceeding a rate limit.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider failed or is overloaded (5xx).
    #[error("provider server error: {0}")]
    Server(String),

    /// Credentials were missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The LLM provider returned an error response.
    #[error("provider api: {0}")]
    Api(String),

    /// The provider response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited(_) | Self::Server(_)
        )
    }
}
