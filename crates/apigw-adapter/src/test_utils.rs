//! Test utilities for pipeline and handler testing.
//!
//! Shared fixtures for this crate and for Lambda crates built on it: an
//! [`EventBuilder`] for proxy events, an in-memory [`FileSource`], and
//! temporary files for exercising the local file source.
//!
//! # Usage
//!
//! Enable the `test-utils` feature from a dependent crate's dev-dependencies:
//!
//! ```ignore
//! use apigw_adapter::test_utils::{mock_request_id, EventBuilder};
//!
//! #[tokio::test]
//! async fn test_handler() {
//!     let event = EventBuilder::post("/users")
//!         .header("Content-Type", "application/json")
//!         .body(r#"{"name":"Alice"}"#)
//!         .build();
//!     let response = pipeline.invoke(event, &mock_request_id("create-user")).await;
//!     assert_eq!(response.status_code, 200);
//! }
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use indexmap::IndexMap;

use crate::error::Result;
use crate::event::{RawEvent, RequestContext};
use crate::files::FileSource;
use crate::request::Request;

/// Boundary used by [`EventBuilder::multipart`].
pub const TEST_BOUNDARY: &str = "----apigw-adapter-test-boundary";

/// Create a mock request ID for testing.
///
/// # Returns
///
/// A request ID string in the format "test-request-{suffix}"
pub fn mock_request_id(suffix: &str) -> String {
    format!("test-request-{}", suffix)
}

/// Fluent builder for [`RawEvent`] fixtures.
#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    event: RawEvent,
}

impl EventBuilder {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            event: RawEvent {
                http_method: method.to_string(),
                path: path.to_string(),
                ..RawEvent::default()
            },
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: &str) -> Self {
        Self::new("POST", path)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.event
            .headers
            .get_or_insert_with(IndexMap::new)
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.event
            .query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.event
            .path_parameters
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.event.body = Some(body.to_string());
        self.event.is_base64_encoded = false;
        self
    }

    /// Set a binary body, base64-encoded the way API Gateway delivers it.
    pub fn base64_body(mut self, body: &[u8]) -> Self {
        self.event.body = Some(BASE64.encode(body));
        self.event.is_base64_encoded = true;
        self
    }

    /// Set a `multipart/form-data` body with the given text fields and
    /// `(field, file name, content type, contents)` files.
    pub fn multipart(self, fields: &[(&str, &str)], files: &[(&str, &str, &str, &str)]) -> Self {
        let content_type = format!("multipart/form-data; boundary={}", TEST_BOUNDARY);
        self.header("Content-Type", &content_type)
            .body(&multipart_body(TEST_BOUNDARY, fields, files))
    }

    pub fn request_id(mut self, request_id: &str) -> Self {
        self.event.request_context = Some(RequestContext {
            request_id: Some(request_id.to_string()),
        });
        self
    }

    pub fn build(self) -> RawEvent {
        self.event
    }

    /// Normalize the event directly, skipping the pipeline.
    pub fn into_request(self) -> Result<Request> {
        Request::from_event(self.event, mock_request_id("fixture"))
    }
}

/// Encode a `multipart/form-data` payload.
pub fn multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &str, &str)],
) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    for (name, file_name, content_type, contents) in files {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n{contents}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

/// Write `contents` to a temporary file that is removed when dropped.
pub fn temp_file_with(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("failed to create temporary file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temporary file");
    file.flush().expect("failed to flush temporary file");
    file
}

/// In-memory [`FileSource`] keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFiles {
    files: HashMap<PathBuf, Bytes>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Bytes>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

#[async_trait]
impl FileSource for MemoryFiles {
    async fn read(&self, path: &Path) -> std::io::Result<Bytes> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not in memory store", path.display()),
            )
        })
    }
}
