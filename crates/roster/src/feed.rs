use std::sync::Arc;
use std::time::Duration;

use crate::player::RawPlayer;

/// Errors that can occur while pulling the roster from a provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::Timeout(_)
        )
    }
}

/// An external source of player reference data.
///
/// `fetch_all` is all-or-nothing: it either returns the full roster or an
/// error, never a partial batch.
#[async_trait::async_trait]
pub trait PlayerFeed: Send + Sync {
    /// Human-readable label identifying this feed.
    fn label(&self) -> &str;

    /// Fetch the current roster.
    async fn fetch_all(&self) -> Result<Vec<RawPlayer>, FetchError>;
}

#[async_trait::async_trait]
impl<T: PlayerFeed + ?Sized> PlayerFeed for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn fetch_all(&self) -> Result<Vec<RawPlayer>, FetchError> {
        (**self).fetch_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(FetchError::RateLimited { retry_after: None }.is_retryable());
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!FetchError::Malformed("bad json".into()).is_retryable());
        assert!(!FetchError::Other("nope".into()).is_retryable());
    }
}
