// ── Core error types ──
//
// Embedder-facing errors from merchkit-core. These are NOT transport
// errors -- consumers never see reqwest internals. The `From<ApiError>`
// impl translates gateway failures into domain-appropriate variants.
// Errors never cross the controller's public boundary as return values:
// they are recorded on the `Fail` state and read via `last_error()`.

use thiserror::Error;

use merchkit_api::ApiError;

/// Failure recorded by a controller when a network operation ends badly.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The server answered with a non-success status.
    #[error("server rejected the operation (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response (connection, DNS, timeout).
    #[error("network failure: {message}")]
    Network { message: String },

    /// Anything that should not happen in a correctly wired embedder.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// The HTTP status, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the resource no longer exists server-side.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<ApiError> for ControlError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http {
                status, message, ..
            } => Self::Http { status, message },
            ApiError::Network(e) => Self::Network {
                message: e.to_string(),
            },
            ApiError::InvalidUrl(e) => Self::Internal(format!("invalid URL: {e}")),
            ApiError::Build(msg) => Self::Internal(msg),
        }
    }
}
