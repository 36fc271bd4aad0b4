//! Interceptable HTTP transport for the merchkit workspace.
//!
//! Every network operation is expressed as a [`Request`] descriptor and
//! routed through a [`Gateway`]: an ordered chain of [`Interceptor`]s is
//! offered the request first, and the first one to claim it supplies the
//! [`Response`]. Unclaimed requests fall through to the default `reqwest`
//! client built from [`TransportConfig`].
//!
//! Interceptors compose like middleware — auth-token injection, offline
//! mock backends, and test harnesses all slot in without the caller
//! knowing any of them exist.

pub mod error;
pub mod gateway;
pub mod request;
pub mod transport;

pub use error::ApiError;
pub use gateway::{Gateway, InterceptFuture, Interceptor};
pub use request::{Method, Request, Response};
pub use transport::TransportConfig;
