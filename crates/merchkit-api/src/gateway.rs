// ── Interceptable request gateway ──
//
// Chain-of-responsibility over an ordered interceptor list: the first
// interceptor to claim a request supplies its response; unclaimed
// requests fall through to the real network client.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::request::{Request, Response};
use crate::transport::TransportConfig;

/// The future an interceptor returns when it claims a request.
pub type InterceptFuture = BoxFuture<'static, Result<Response, ApiError>>;

/// A middleware stage in the gateway chain.
///
/// Returning `None` passes the request to the next stage (and eventually
/// the network); returning `Some(future)` claims it — the future's outcome
/// is used verbatim and nothing further runs.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, request: &Request) -> Option<InterceptFuture>;
}

/// Issues resource operations, offering each to the interceptor chain
/// before touching the network.
///
/// Cheaply cloneable; controllers bound to the same API share one gateway.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    http: reqwest::Client,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Gateway {
    /// A gateway with no interceptors — every request hits the network.
    pub fn new(config: &TransportConfig) -> Result<Self, ApiError> {
        Self::with_interceptors(config, Vec::new())
    }

    /// A gateway with an ordered interceptor chain.
    ///
    /// Interceptors are tried in the order given; position 0 sees every
    /// request first.
    pub fn with_interceptors(
        config: &TransportConfig,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            inner: Arc::new(GatewayInner {
                http: config.build_client()?,
                interceptors,
            }),
        })
    }

    /// Send a request through the chain, falling back to the network.
    pub async fn send(&self, request: Request) -> Result<Response, ApiError> {
        for (position, interceptor) in self.inner.interceptors.iter().enumerate() {
            if let Some(claimed) = interceptor.intercept(&request) {
                debug!(
                    position,
                    method = request.method.as_str(),
                    url = %request.url,
                    "request claimed by interceptor"
                );
                return claimed.await;
            }
        }

        self.dispatch(request).await
    }

    /// Perform the actual network call for an unclaimed request.
    async fn dispatch(&self, request: Request) -> Result<Response, ApiError> {
        debug!("{} {}", request.method.as_str(), request.url);

        let mut builder = self
            .inner
            .http
            .request(request.method.into(), request.url);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        // Empty bodies (204, some DELETEs) parse to null; non-JSON bodies
        // are preserved verbatim for diagnostics.
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if status.is_success() {
            Ok(Response {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(&body, status),
                body,
            })
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Checks the common `message` member, then the HAL error embed the
/// commerce API uses, then falls back to the canonical status reason.
fn error_message(body: &Value, status: reqwest::StatusCode) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| {
            body.pointer("/_embedded/errors/0/message")
                .and_then(Value::as_str)
        })
        .map(str::to_owned)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_owned()
        })
}
