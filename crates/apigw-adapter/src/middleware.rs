//! Ordered pre-handler steps.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tracing::debug;

use crate::error::Result;
use crate::request::Request;
use crate::response::ResponseBuilder;

/// A side-effecting step run before the handler.
///
/// Middleware may change the response (status, headers, redirects), attach
/// data to the request with [`Request::set_custom`], or fail. A failure stops
/// the chain: no later middleware and no handler run.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: &mut Request, response: &mut ResponseBuilder) -> Result<()>;
}

/// Middleware backed by a closure. Created with [`middleware_fn`].
pub struct MiddlewareFn<F>(F);

/// Wrap a closure returning a boxed future as [`Middleware`].
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut ResponseBuilder) -> BoxFuture<'a, Result<()>>
        + Send
        + Sync,
{
    MiddlewareFn(f)
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut ResponseBuilder) -> BoxFuture<'a, Result<()>>
        + Send
        + Sync,
{
    async fn handle(&self, request: &mut Request, response: &mut ResponseBuilder) -> Result<()> {
        (self.0)(request, response).await
    }
}

/// Run `chain` in order, each step awaited before the next starts.
pub async fn run_chain(
    chain: &[Arc<dyn Middleware>],
    request: &mut Request,
    response: &mut ResponseBuilder,
) -> Result<()> {
    for (index, middleware) in chain.iter().enumerate() {
        debug!(index, "running middleware");
        middleware.handle(request, response).await?;
    }
    Ok(())
}
