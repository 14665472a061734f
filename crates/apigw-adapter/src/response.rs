//! Invocation-scoped response state shared by middleware and the handler.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::StatusCode;
use tracing::debug;

use crate::error::{ErrorPayload, HttpError, Result};
use crate::event::HttpResponse;
use crate::files::FileSource;

/// Encoding used to turn file contents into a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileEncoding {
    /// Contents must be valid UTF-8.
    #[default]
    Utf8,
    /// Contents are base64-encoded.
    Base64,
}

/// Mutable response state for one invocation.
///
/// Created fresh for every invocation and passed by `&mut` to each
/// middleware and then to the handler, so changes made by one step are seen
/// by every later step. Status defaults to `200 OK`.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    files: Arc<dyn FileSource>,
}

impl ResponseBuilder {
    /// Create an empty response reading files from `files`.
    pub fn new(files: Arc<dyn FileSource>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: BTreeMap::new(),
            files,
        }
    }

    /// Current status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Overwrite the status code.
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Headers set so far.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Look up a header set so far, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Insert or replace a header.
    ///
    /// An existing header whose name differs only in case is replaced.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl fmt::Display) -> &mut Self {
        let name = name.into();
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.to_string());
        self
    }

    /// Redirect to `location`.
    ///
    /// Sets the `Location` header and the status, `302 Found` unless another
    /// status is given.
    pub fn redirect(
        &mut self,
        location: impl fmt::Display,
        status: impl Into<Option<StatusCode>>,
    ) -> &mut Self {
        let status = status.into().unwrap_or(StatusCode::FOUND);
        self.set_header("Location", location).set_status(status)
    }

    /// Read a local resource as UTF-8 text.
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<String> {
        self.read_file_as(path, FileEncoding::Utf8).await
    }

    /// Read a local resource with the given encoding.
    ///
    /// Every failure, whatever its cause, is reported as not found.
    pub async fn read_file_as(&self, path: impl AsRef<Path>, encoding: FileEncoding) -> Result<String> {
        let path = path.as_ref();
        let not_found = || HttpError::not_found(format!("resource '{}' not found", path.display()));

        let bytes = self.files.read(path).await.map_err(|e| {
            debug!(path = %path.display(), error = %e, "file read failed");
            not_found()
        })?;

        match encoding {
            FileEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| {
                debug!(path = %path.display(), error = %e, "file is not valid UTF-8");
                not_found()
            }),
            FileEncoding::Base64 => Ok(BASE64.encode(&bytes)),
        }
    }

    /// Final response for a successful invocation.
    pub(crate) fn into_response(mut self, body: String, content_type: Option<&str>) -> HttpResponse {
        if let Some(content_type) = content_type {
            if self.header("content-type").is_none() {
                self.set_header("Content-Type", content_type);
            }
        }
        HttpResponse {
            status_code: self.status.as_u16(),
            headers: self.headers,
            body,
            is_base64_encoded: false,
        }
    }

    /// Final response for a failed invocation.
    ///
    /// Headers accumulated before the failure are kept; status and body come
    /// from the error payload.
    pub(crate) fn into_error_response(mut self, payload: &ErrorPayload) -> HttpResponse {
        self.status = payload.status();
        let body = serde_json::to_string(payload).unwrap_or_default();
        self.into_response(body, Some("application/json"))
    }
}

impl fmt::Debug for ResponseBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBuilder")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::LocalFiles;
    use crate::test_utils::{temp_file_with, MemoryFiles};

    fn builder() -> ResponseBuilder {
        ResponseBuilder::new(Arc::new(LocalFiles::new()))
    }

    #[test]
    fn test_defaults() {
        let response = builder();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_set_header_coerces_and_upserts() {
        let mut response = builder();
        response.set_header("X-Count", 3).set_header("x-count", 4);

        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.header("X-COUNT"), Some("4"));
    }

    #[test]
    fn test_redirect_with_status() {
        let mut response = builder();
        response.redirect("/new", StatusCode::MOVED_PERMANENTLY);

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header("Location"), Some("/new"));
    }

    #[test]
    fn test_redirect_defaults_to_found() {
        let mut response = builder();
        response.redirect("/new", None);

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.header("location"), Some("/new"));
    }

    #[tokio::test]
    async fn test_read_file_utf8() {
        let file = temp_file_with("<h1>hi</h1>");
        let contents = builder().read_file(file.path()).await.unwrap();
        assert_eq!(contents, "<h1>hi</h1>");
    }

    #[tokio::test]
    async fn test_read_file_base64() {
        let files = MemoryFiles::new().with_file("logo.bin", vec![0xff, 0x00, 0x10]);
        let response = ResponseBuilder::new(Arc::new(files));

        let contents = response
            .read_file_as("logo.bin", FileEncoding::Base64)
            .await
            .unwrap();
        assert_eq!(contents, "/wAQ");

        let err = response.read_file("logo.bin").await.unwrap_err();
        assert!(matches!(err, HttpError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let err = builder()
            .read_file("/definitely/not/here.txt")
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("here.txt"));
    }

    #[test]
    fn test_error_response_keeps_headers() {
        let mut response = builder();
        response
            .set_header("X-Request-Id", "abc")
            .set_status(StatusCode::CREATED);

        let payload = ErrorPayload::new(StatusCode::BAD_REQUEST, "nope");
        let http = response.into_error_response(&payload);

        assert_eq!(http.status_code, 400);
        assert_eq!(http.header("x-request-id"), Some("abc"));
        assert_eq!(http.header("content-type"), Some("application/json"));
        assert_eq!(
            http.body,
            r#"{"statusCode":400,"error":"Bad Request","message":"nope"}"#
        );
    }

    #[test]
    fn test_content_type_not_overridden() {
        let mut response = builder();
        response.set_header("content-type", "text/html");

        let http = response.into_response("<p/>".to_string(), Some("application/json"));
        assert_eq!(http.header("Content-Type"), Some("text/html"));
        assert_eq!(http.headers.len(), 1);
    }
}
