//! The orchestrator: the single entry point invoked per event.
//!
//! ```text
//! RawEvent ─▶ Request::from_event ─▶ resolve_body ─▶ ValidationRules::check
//!          ─▶ run_chain(middleware) ─▶ Handler::call ─▶ Reply::into_body
//!                       │ any Err
//!                       ▼
//!                   map_error ─▶ HttpResponse (headers kept)
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::anyhow;
use futures_util::FutureExt;
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use tracing::{debug, error, info, info_span, Instrument};

use crate::config::AdapterConfig;
use crate::error::{map_error, ErrorPayload, HttpError, Result};
use crate::event::{HttpResponse, RawEvent};
use crate::files::{FileSource, LocalFiles};
use crate::handler::{Handler, Reply};
use crate::middleware::{run_chain, Middleware};
use crate::request::Request;
use crate::response::ResponseBuilder;
use crate::validation::ValidationRules;

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    handler: Arc<dyn Handler>,
    middleware: Vec<Arc<dyn Middleware>>,
    rules: ValidationRules,
    files: Option<Arc<dyn FileSource>>,
    config: AdapterConfig,
}

impl PipelineBuilder {
    /// Replace the configuration.
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Schemas checked before middleware runs.
    pub fn validate(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    /// Append a middleware. Middleware run in the order they are added.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Storage used by `read_file`. Defaults to the local filesystem rooted
    /// at the configured static root.
    pub fn file_source(mut self, files: impl FileSource + 'static) -> Self {
        self.files = Some(Arc::new(files));
        self
    }

    pub fn build(self) -> Pipeline {
        let files: Arc<dyn FileSource> = match self.files {
            Some(files) => files,
            None => match &self.config.static_root {
                Some(root) => Arc::new(LocalFiles::with_root(root.clone())),
                None => Arc::new(LocalFiles::new()),
            },
        };

        Pipeline {
            handler: self.handler,
            middleware: self.middleware,
            rules: self.rules,
            files,
            config: self.config,
        }
    }
}

/// Immutable pipeline definition, built once and shared by every invocation.
pub struct Pipeline {
    handler: Arc<dyn Handler>,
    middleware: Vec<Arc<dyn Middleware>>,
    rules: ValidationRules,
    files: Arc<dyn FileSource>,
    config: AdapterConfig,
}

impl Pipeline {
    /// Start building a pipeline around `handler`.
    pub fn builder(handler: impl Handler + 'static) -> PipelineBuilder {
        PipelineBuilder {
            handler: Arc::new(handler),
            middleware: Vec::new(),
            rules: ValidationRules::default(),
            files: None,
            config: AdapterConfig::default(),
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Process one event.
    ///
    /// Never fails: every error, and any panic raised by middleware or the
    /// handler, is mapped to a well-formed response. Headers set before a
    /// failure are kept; status and body are replaced by the mapped error.
    pub async fn invoke(&self, event: RawEvent, request_id: &str) -> HttpResponse {
        let span = info_span!(
            "invocation",
            request_id = %request_id,
            method = %event.http_method,
            path = %event.path,
        );

        async move {
            let mut response = ResponseBuilder::new(Arc::clone(&self.files));
            let outcome = AssertUnwindSafe(self.execute(event, request_id, &mut response))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(HttpError::internal(anyhow!(
                        "panic in middleware or handler: {}",
                        panic_message(panic.as_ref())
                    )))
                })
                .and_then(Reply::into_body);

            let result = match outcome {
                Ok((body, content_type)) => response.into_response(body, content_type),
                Err(err) => response.into_error_response(&map_error(err, request_id)),
            };

            info!(status = result.status_code, "invocation complete");
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        event: RawEvent,
        request_id: &str,
        response: &mut ResponseBuilder,
    ) -> Result<Reply> {
        let mut request = Request::from_event(event, request_id)?;

        if request.has_pending_body() {
            debug!("decoding multipart body");
            request.resolve_body(&self.config.multipart).await?;
        }

        if !self.rules.is_empty() {
            self.rules.check(&request)?;
        }

        run_chain(&self.middleware, &mut request, response).await?;

        debug!("invoking handler");
        self.handler.call(&request, response).await
    }

    /// Lambda-facing entry point.
    ///
    /// Always returns `Ok`. A payload that is not a proxy event is a platform
    /// fault and yields a generic 500 response.
    pub async fn handle(
        &self,
        event: LambdaEvent<Value>,
    ) -> std::result::Result<HttpResponse, lambda_runtime::Error> {
        let payload = event.payload;
        let context = event.context;

        let response = match serde_json::from_value::<RawEvent>(payload) {
            Ok(raw) => {
                let request_id = if context.request_id.is_empty() {
                    raw.context_request_id().unwrap_or_default().to_string()
                } else {
                    context.request_id.clone()
                };
                self.invoke(raw, &request_id).await
            }
            Err(e) => {
                error!(request_id = %context.request_id, error = %e, "payload is not an API Gateway proxy event");
                ResponseBuilder::new(Arc::clone(&self.files))
                    .into_error_response(&ErrorPayload::internal())
            }
        };

        Ok(response)
    }

    /// Serve events from the Lambda runtime until it shuts down.
    pub async fn run(self) -> std::result::Result<(), lambda_runtime::Error> {
        let pipeline = Arc::new(self);
        lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.handle(event).await }
        }))
        .await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
