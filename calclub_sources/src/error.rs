use std::time::Duration;
use thiserror::Error;

/// Why a source produced nothing. Logged by the adapter, never returned to
/// the aggregator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("missing API key for {0}")]
    MissingCredentials(&'static str),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("remote job failed: {0}")]
    JobFailed(String),
}

impl SourceError {
    /// Worth another attempt: connection problems, timeouts, 429 and 5xx.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status()
                        .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            Self::Timeout(_) => true,
            Self::MissingCredentials(_) | Self::Malformed(_) | Self::JobFailed(_) => false,
        }
    }
}
