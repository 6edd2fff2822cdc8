//! Remote row sources for server mode.
//!
//! In server mode the grid hands every filter/sort/page decision to a remote
//! endpoint. A page request is built from the grid state, optionally reshaped
//! by a [`RequestHandler`], sent through a [`DataSource`], and the raw answer
//! is adapted by a [`ResponseHandler`] before it is parsed as a
//! [`GridResponse`].

mod contract;
mod http;

pub use contract::*;
pub use http::*;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::error::TransportError;

/// Something that can answer page requests.
///
/// Implementations must be cancel-safe: the grid drops the future when a
/// newer refresh supersedes it.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Sends a request payload and returns the raw response payload.
    async fn fetch(&self, request: Json) -> Result<Json, TransportError>;
}

#[async_trait]
impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    async fn fetch(&self, request: Json) -> Result<Json, TransportError> {
        (**self).fetch(request).await
    }
}

type RequestFn = dyn Fn(Json) -> Json + Send + Sync;
type ResponseFn = dyn Fn(Json) -> Result<Json, String> + Send + Sync;

/// Reshapes an outgoing request payload before transport.
#[derive(Clone)]
pub struct RequestHandler(Arc<RequestFn>);

impl RequestHandler {
    pub fn new(f: impl Fn(Json) -> Json + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, request: Json) -> Json {
        (self.0)(request)
    }
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestHandler(..)")
    }
}

/// Adapts an arbitrary server payload to the `{current, rows, totals}` shape.
///
/// Returning `Err` marks the response as unusable.
#[derive(Clone)]
pub struct ResponseHandler(Arc<ResponseFn>);

impl ResponseHandler {
    pub fn new(f: impl Fn(Json) -> Result<Json, String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, response: Json) -> Result<Json, TransportError> {
        (self.0)(response).map_err(TransportError::Handler)
    }
}

impl fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseHandler(..)")
    }
}

/// Runs one page request through the hooks and the source.
pub async fn fetch_page(
    source: &dyn DataSource,
    request: &GridRequest,
    request_handler: Option<&RequestHandler>,
    response_handler: Option<&ResponseHandler>,
) -> Result<GridResponse, TransportError> {
    let mut payload = request.to_json();
    if let Some(handler) = request_handler {
        payload = handler.apply(payload);
    }
    let mut response = source.fetch(payload).await?;
    if let Some(handler) = response_handler {
        response = handler.apply(response)?;
    }
    GridResponse::from_json(response)
}
