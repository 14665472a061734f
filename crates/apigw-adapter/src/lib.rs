//! API Gateway proxy-event adapter for AWS Lambda.
//!
//! This crate turns a REST proxy event into a normalized [`Request`], runs it
//! through an optional validation stage and an ordered middleware chain,
//! invokes one [`Handler`], and produces an [`HttpResponse`]. Every failure is
//! mapped to a structured error payload:
//!
//! - [`Request`]: lower-cased headers, query/path parameters, decoded body
//! - [`ValidationRules`]: query → params → body schema checks
//! - [`Middleware`]: ordered pre-handler steps sharing a [`ResponseBuilder`]
//! - [`map_error`]: client-fault vs internal error mapping
//! - [`Pipeline`]: the orchestrator and Lambda entry point
//! - [`init_tracing`]: JSON-formatted tracing for CloudWatch Logs
//!
//! # Example
//!
//! ```no_run
//! use apigw_adapter::{handler_fn, init_tracing, LoggingConfig, Pipeline, Reply};
//! use futures_util::FutureExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_runtime::Error> {
//!     init_tracing(&LoggingConfig::from_env());
//!
//!     let handler = handler_fn(|request, _response| {
//!         async move { Ok::<_, apigw_adapter::HttpError>(Reply::Json(request.body().clone())) }.boxed()
//!     });
//!
//!     Pipeline::builder(handler).build().run().await
//! }
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides event fixtures and an in-memory file
//! source. Enable the `test-utils` feature to access it from dependent crates.

mod body;
mod config;
mod error;
mod event;
mod files;
mod handler;
mod middleware;
mod pipeline;
mod request;
mod response;
mod tracing_init;
mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use body::{decode_form, decode_json, decode_multipart, BodyKind, MultipartBody, UploadedFile};
pub use config::{AdapterConfig, MultipartLimits, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_FIELDS};
pub use error::{map_error, ErrorPayload, HttpError, Result, INTERNAL_ERROR_MESSAGE};
pub use event::{HttpResponse, RawEvent, RequestContext};
pub use files::{FileSource, LocalFiles};
pub use handler::{handler_fn, Handler, HandlerFn, Reply};
pub use middleware::{middleware_fn, run_chain, Middleware, MiddlewareFn};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use request::Request;
pub use response::{FileEncoding, ResponseBuilder};
pub use tracing_init::{init_tracing, LogFormat, LoggingConfig};
pub use validation::{schema_fn, FnSchema, Schema, Typed, ValidationRules, ValidationTarget};

/// Re-exported so implementors can use `#[async_trait]` without a direct dependency.
pub use async_trait::async_trait;
/// Status codes accepted by [`ResponseBuilder`] and [`HttpError`].
pub use http::StatusCode;
