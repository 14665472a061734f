//! Content-type driven body decoding.
//!
//! [`BodyKind::classify`] picks a decoding strategy once from the
//! `Content-Type` header. Form and JSON bodies are decoded synchronously while
//! the request is normalized; multipart bodies are decoded by
//! [`decode_multipart`], which the pipeline awaits as a separate step.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::config::MultipartLimits;
use crate::error::{HttpError, Result};

/// Decoding strategy selected from the request's content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `application/x-www-form-urlencoded`
    Form,
    /// `application/json`
    Json,
    /// `multipart/form-data`
    Multipart,
    /// Anything else; the body is kept as the raw string.
    Raw,
}

impl BodyKind {
    /// Classify a `Content-Type` header value.
    ///
    /// Parameters after the first `;` are ignored and the media type is
    /// compared case-insensitively. A missing header is [`BodyKind::Raw`].
    pub fn classify(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Raw;
        };
        let essence = content_type.split(';').next().unwrap_or_default().trim();

        if essence.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            Self::Form
        } else if essence.eq_ignore_ascii_case("application/json") {
            Self::Json
        } else if essence.eq_ignore_ascii_case("multipart/form-data") {
            Self::Multipart
        } else {
            Self::Raw
        }
    }
}

/// Decode a URL-encoded form into a flat mapping of strings.
///
/// When a key repeats, the last value wins. Decoding is lenient: percent
/// sequences that are not valid UTF-8 become U+FFFD rather than an error.
pub fn decode_form(raw: &str) -> Result<Value> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(raw).map_err(|e| HttpError::BodyParse(e.to_string()))?;

    let mut fields = Map::new();
    for (key, value) in pairs {
        fields.insert(key, Value::String(value));
    }
    Ok(Value::Object(fields))
}

/// Decode a JSON document.
pub fn decode_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| HttpError::BodyParse(e.to_string()))
}

/// A file received in a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Name of the form field the file was sent under.
    pub field_name: String,
    /// Client-supplied file name.
    pub file_name: Option<String>,
    /// Declared media type of the part.
    pub content_type: Option<String>,
    /// File contents.
    pub content: Bytes,
}

impl UploadedFile {
    /// JSON view of the file as merged into the request body.
    ///
    /// Contents are base64-encoded so binary uploads survive the conversion.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "fieldname": self.field_name,
            "filename": self.file_name,
            "contentType": self.content_type,
            "size": self.content.len(),
            "content": BASE64.encode(&self.content),
        })
    }
}

/// Decoded `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartBody {
    /// Text fields and files, files keyed by their field name.
    pub fields: Value,
    /// Uploaded files in the order they were received.
    pub files: Vec<UploadedFile>,
}

/// Decode a `multipart/form-data` body.
///
/// The boundary is taken from `content_type`. Text parts become string
/// fields; file parts (those with a file name) are collected into
/// [`MultipartBody::files`] and also stored in the field mapping under their
/// field name.
pub async fn decode_multipart(
    content_type: &str,
    body: Bytes,
    limits: &MultipartLimits,
) -> Result<MultipartBody> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| HttpError::BodyParse(format!("invalid multipart content type: {}", e)))?;

    if body.len() > limits.max_body_bytes {
        return Err(HttpError::BodyParse(format!(
            "multipart body of {} bytes exceeds limit of {} bytes",
            body.len(),
            limits.max_body_bytes
        )));
    }

    let stream = futures_util::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = Map::new();
    let mut files = Vec::new();
    let mut field_count = 0usize;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        field_count += 1;
        if field_count > limits.max_fields {
            return Err(HttpError::BodyParse(format!(
                "too many multipart fields (max {})",
                limits.max_fields
            )));
        }

        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());

        if file_name.is_some() {
            let content = field.bytes().await.map_err(multipart_error)?;
            files.push(UploadedFile {
                field_name,
                file_name,
                content_type,
                content,
            });
        } else {
            let text = field.text().await.map_err(multipart_error)?;
            fields.insert(field_name, Value::String(text));
        }
    }

    for file in &files {
        fields.insert(file.field_name.clone(), file.to_value());
    }

    Ok(MultipartBody {
        fields: Value::Object(fields),
        files,
    })
}

fn multipart_error(error: multer::Error) -> HttpError {
    HttpError::BodyParse(format!("malformed multipart body: {}", error))
}
