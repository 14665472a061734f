//! Normalized request built once per invocation.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::body::{decode_form, decode_json, decode_multipart, BodyKind, UploadedFile};
use crate::config::MultipartLimits;
use crate::error::{HttpError, Result};
use crate::event::RawEvent;

/// Multipart body waiting to be decoded.
#[derive(Debug, Clone)]
struct PendingBody {
    content_type: String,
    bytes: Bytes,
}

/// Canonical view of an inbound event.
///
/// Header names are stored lower-cased, so [`Request::header`] is
/// case-insensitive. `query` and `params` are empty when the event carried
/// none. Multipart bodies are not decoded until [`Request::resolve_body`] has
/// been awaited; until then [`Request::body`] is `null`.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    path: String,
    request_id: String,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    params: HashMap<String, String>,
    body: Value,
    files: Vec<UploadedFile>,
    pending: Option<PendingBody>,
    custom: Map<String, Value>,
}

impl Request {
    /// Normalize a raw event.
    ///
    /// Fails only when the body does not decode according to its content
    /// type.
    pub fn from_event(event: RawEvent, request_id: impl Into<String>) -> Result<Self> {
        // Payload order; the last of several casings of one name wins
        let headers: HashMap<String, String> = event
            .headers
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        let raw_body = event.body.unwrap_or_default();
        let kind = BodyKind::classify(headers.get("content-type").map(String::as_str));

        let mut pending = None;
        let body = match kind {
            BodyKind::Raw => Value::String(raw_body),
            BodyKind::Form => decode_form(&body_text(raw_body, event.is_base64_encoded)?)?,
            BodyKind::Json => decode_json(&body_text(raw_body, event.is_base64_encoded)?)?,
            BodyKind::Multipart => {
                let content_type = headers
                    .get("content-type")
                    .cloned()
                    .unwrap_or_default();
                pending = Some(PendingBody {
                    content_type,
                    bytes: body_bytes(raw_body, event.is_base64_encoded)?,
                });
                Value::Null
            }
        };

        Ok(Self {
            method: event.http_method,
            path: event.path,
            request_id: request_id.into(),
            headers,
            query: event.query_string_parameters.unwrap_or_default(),
            params: event.path_parameters.unwrap_or_default(),
            body,
            files: Vec::new(),
            pending,
            custom: Map::new(),
        })
    }

    /// Whether the body still has to be decoded with [`Request::resolve_body`].
    pub fn has_pending_body(&self) -> bool {
        self.pending.is_some()
    }

    /// Decode a pending multipart body. A no-op for every other content type.
    pub async fn resolve_body(&mut self, limits: &MultipartLimits) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let decoded = decode_multipart(&pending.content_type, pending.bytes, limits).await?;
        self.body = decoded.fields;
        self.files = decoded.files;
        Ok(())
    }

    /// HTTP method as sent by API Gateway.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Invocation identifier used for log correlation.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Look up a header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers, keyed by lower-cased name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Query-string parameters.
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// A single query-string parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Path parameters.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// A single path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Decoded body.
    ///
    /// An object for form, JSON objects and multipart bodies; the raw string
    /// for any other content type.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Deserialize the decoded body into `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.body).map_err(|e| HttpError::bad_request(e.to_string()))
    }

    /// Files received in a multipart body.
    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// Value attached by middleware under `key`.
    pub fn custom(&self, key: &str) -> Option<&Value> {
        self.custom.get(key)
    }

    /// All values attached by middleware.
    pub fn custom_values(&self) -> &Map<String, Value> {
        &self.custom
    }

    /// Attach a value for downstream middleware and the handler.
    ///
    /// Returns the previous value stored under `key`, if any.
    pub fn set_custom(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.custom.insert(key.into(), value.into())
    }
}

fn body_bytes(raw: String, is_base64_encoded: bool) -> Result<Bytes> {
    if is_base64_encoded {
        BASE64
            .decode(raw.trim())
            .map(Bytes::from)
            .map_err(|e| HttpError::BodyParse(format!("invalid base64 body: {}", e)))
    } else {
        Ok(Bytes::from(raw))
    }
}

fn body_text(raw: String, is_base64_encoded: bool) -> Result<String> {
    if !is_base64_encoded {
        return Ok(raw);
    }
    let bytes = body_bytes(raw, true)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| HttpError::BodyParse(format!("body is not valid UTF-8: {}", e)))
}
