//! Echo function built on `apigw-adapter`.
//!
//! The API Gateway resources pointing at this function are:
//!
//! - `ANY /echo`: responds with the normalized request as JSON
//! - `GET /static/{file}`: serves `{file}` from the static root
//! - any route with `?redirect=<location>`: responds `302 Found`
//!
//! Requests that pass validation get `X-Request-Id` and CORS headers, which
//! are kept even when the handler fails.

use std::collections::HashMap;
use std::path::Path;

use apigw_adapter::{
    init_tracing, schema_fn, AdapterConfig, Handler, LoggingConfig, Middleware, Pipeline, Reply,
    Request, ResponseBuilder, Result, Typed, ValidationRules,
};
use async_trait::async_trait;
use lambda_runtime::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Name reported in the startup log line.
pub const SERVICE_NAME: &str = "apigw-adapter-echo";

/// Static root used when `ADAPTER_STATIC_ROOT` is not set.
pub const DEFAULT_STATIC_ROOT: &str = "static";

/// Entry point used by the Lambda runtime.
pub async fn run() -> std::result::Result<(), Error> {
    init_tracing(&LoggingConfig::from_env().with_service(SERVICE_NAME));

    let mut config = AdapterConfig::from_env();
    if config.static_root.is_none() {
        config = config.with_static_root(DEFAULT_STATIC_ROOT);
    }

    info!(
        static_root = ?config.static_root,
        max_fields = config.multipart.max_fields,
        max_body_bytes = config.multipart.max_body_bytes,
        "starting echo function"
    );

    build_pipeline(config).run().await
}

/// Assemble the echo pipeline.
pub fn build_pipeline(config: AdapterConfig) -> Pipeline {
    Pipeline::builder(EchoHandler)
        .config(config)
        .validate(validation_rules())
        .middleware(RequestIdHeader)
        .middleware(CorsHeaders::default())
        .build()
}

/// Query parameters the echo routes accept.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EchoQuery {
    pub redirect: Option<String>,
    pub greeting: Option<String>,
}

/// Schemas for the echo routes.
///
/// - query: only the keys of [`EchoQuery`]
/// - params: `file` must be a plain file name
/// - body: must not carry a `password` field
pub fn validation_rules() -> ValidationRules {
    ValidationRules::new()
        .query(Typed::<EchoQuery>::new())
        .params(schema_fn(check_file_param))
        .body(schema_fn(reject_password))
}

fn check_file_param(params: &Value) -> std::result::Result<(), String> {
    match params.get("file").and_then(Value::as_str) {
        Some(name) if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) => {
            Err(format!("\"file\" must be a plain file name, got {:?}", name))
        }
        _ => Ok(()),
    }
}

fn reject_password(body: &Value) -> std::result::Result<(), String> {
    if body.get("password").is_some() {
        return Err("\"password\" is not allowed".to_string());
    }
    Ok(())
}

/// Copies the invocation's request id into the `X-Request-Id` response
/// header and into `custom.requestId`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdHeader;

#[async_trait]
impl Middleware for RequestIdHeader {
    async fn handle(&self, request: &mut Request, response: &mut ResponseBuilder) -> Result<()> {
        let request_id = request.request_id().to_string();
        response.set_header("X-Request-Id", &request_id);
        request.set_custom("requestId", request_id);
        Ok(())
    }
}

/// Adds CORS headers to every response.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: String,
}

impl CorsHeaders {
    pub fn new(allow_origin: impl Into<String>) -> Self {
        Self {
            allow_origin: allow_origin.into(),
        }
    }
}

impl Default for CorsHeaders {
    fn default() -> Self {
        Self::new("*")
    }
}

#[async_trait]
impl Middleware for CorsHeaders {
    async fn handle(&self, request: &mut Request, response: &mut ResponseBuilder) -> Result<()> {
        response
            .set_header("Access-Control-Allow-Origin", &self.allow_origin)
            .set_header("Access-Control-Allow-Headers", "Content-Type,Authorization");
        if self.allow_origin != "*" {
            response.set_header("Vary", "Origin");
        }
        if let Some(origin) = request.header("origin").map(str::to_string) {
            request.set_custom("origin", origin);
        }
        Ok(())
    }
}

/// Responds with the normalized request, a static file, or a redirect.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[derive(Debug, Serialize)]
struct Echo<'a> {
    method: &'a str,
    path: &'a str,
    query: &'a HashMap<String, String>,
    params: &'a HashMap<String, String>,
    body: &'a Value,
    custom: &'a Map<String, Value>,
    files: Vec<FileSummary<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileSummary<'a> {
    field_name: &'a str,
    file_name: Option<&'a str>,
    size: usize,
}

#[async_trait]
impl Handler for EchoHandler {
    async fn call(&self, request: &Request, response: &mut ResponseBuilder) -> Result<Reply> {
        if let Some(location) = request.query_param("redirect") {
            debug!(location = %location, "redirecting");
            response.redirect(location, None);
            return Ok(Reply::Empty);
        }

        if let Some(file) = request.param("file") {
            let contents = response.read_file(file).await?;
            response.set_header("Content-Type", content_type_for(file));
            return Ok(Reply::Text(contents));
        }

        let files = request
            .files()
            .iter()
            .map(|file| FileSummary {
                field_name: &file.field_name,
                file_name: file.file_name.as_deref(),
                size: file.content.len(),
            })
            .collect();

        Reply::json(&Echo {
            method: request.method(),
            path: request.path(),
            query: request.query(),
            params: request.params(),
            body: request.body(),
            custom: request.custom_values(),
            files,
        })
    }
}

fn content_type_for(file: &str) -> &'static str {
    match Path::new(file).extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("css") => "text/css",
        _ => "text/plain; charset=utf-8",
    }
}
