//! API Gateway REST proxy event and response shapes.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Inbound proxy event as delivered by API Gateway.
///
/// Only the fields the pipeline reads are modelled; unknown fields are
/// ignored. API Gateway sends `null` rather than `{}` for empty mappings, so
/// every mapping is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Request path, e.g. `/users/42`.
    #[serde(default)]
    pub path: String,

    /// HTTP method, e.g. `POST`.
    #[serde(default)]
    pub http_method: String,

    /// Request headers with the casing the client sent, in payload order.
    #[serde(default)]
    pub headers: Option<IndexMap<String, String>>,

    /// Query-string parameters.
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,

    /// Path parameters captured by the API Gateway resource.
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,

    /// Raw request body.
    #[serde(default)]
    pub body: Option<String>,

    /// Whether `body` is base64-encoded (binary payloads).
    #[serde(default)]
    pub is_base64_encoded: bool,

    /// Request metadata added by API Gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_context: Option<RequestContext>,
}

/// Subset of the API Gateway request context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// API Gateway's own request identifier.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl RawEvent {
    /// Request identifier carried inside the event, if any.
    pub fn context_request_id(&self) -> Option<&str> {
        self.request_context
            .as_ref()
            .and_then(|ctx| ctx.request_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Outbound response handed back to API Gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    /// HTTP status code.
    pub status_code: u16,

    /// Response headers.
    pub headers: BTreeMap<String, String>,

    /// Serialized response body.
    pub body: String,

    /// Always `false`: bodies are emitted as text.
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl HttpResponse {
    /// Look up a response header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
