use serde_json::Value;
use thiserror::Error;

/// Top-level error type for the `merchkit-api` crate.
///
/// Covers every transport failure mode: non-success HTTP responses,
/// connection-level errors, and client construction. `merchkit-core`
/// maps these into its own domain error before they reach embedders.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    ///
    /// `message` is extracted from the error body when the API provides
    /// one; `body` carries the full parsed payload for diagnostics.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: Value,
    },

    /// Transport-level failure (connection refused, DNS, timeout, …).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed from its config.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl ApiError {
    /// The HTTP status, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if this is a transient error worth retrying
    /// (merchkit itself never retries — embedders may).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => matches!(*status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }
}
