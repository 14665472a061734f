//! The user handler and the value it returns.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::{HttpError, Result};
use crate::request::Request;
use crate::response::ResponseBuilder;

/// Body produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// No body.
    Empty,
    /// Used verbatim as the body.
    Text(String),
    /// Serialized to JSON.
    Json(Value),
}

impl Reply {
    /// Serialize any value as a JSON reply.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Reply::Json)
            .map_err(HttpError::internal)
    }

    /// Body string and the content type it implies.
    pub(crate) fn into_body(self) -> Result<(String, Option<&'static str>)> {
        match self {
            Reply::Empty => Ok((String::new(), None)),
            Reply::Text(text) => Ok((text, None)),
            Reply::Json(value) => serde_json::to_string(&value)
                .map(|body| (body, Some("application/json")))
                .map_err(HttpError::internal),
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

/// The single handler a pipeline invokes once validation and middleware pass.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: &Request, response: &mut ResponseBuilder) -> Result<Reply>;
}

/// Handler backed by a closure. Created with [`handler_fn`].
pub struct HandlerFn<F>(F);

/// Wrap a closure returning a boxed future as a [`Handler`].
///
/// ```
/// use apigw_adapter::{handler_fn, Reply};
/// use futures_util::FutureExt;
///
/// let handler = handler_fn(|request, _response| {
///     async move { Ok::<_, apigw_adapter::HttpError>(Reply::from(request.path().to_string())) }.boxed()
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a Request, &'a mut ResponseBuilder) -> BoxFuture<'a, Result<Reply>> + Send + Sync,
{
    HandlerFn(f)
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a Request, &'a mut ResponseBuilder) -> BoxFuture<'a, Result<Reply>> + Send + Sync,
{
    async fn call(&self, request: &Request, response: &mut ResponseBuilder) -> Result<Reply> {
        (self.0)(request, response).await
    }
}
