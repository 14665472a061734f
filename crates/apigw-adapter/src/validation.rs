//! Schema validation of the normalized request.
//!
//! The schema engine itself is external: anything implementing [`Schema`]
//! can be plugged in. Two adapters ship with the crate:
//!
//! - [`Typed`] treats a serde type as the schema; a value passes when it
//!   deserializes into that type;
//! - [`schema_fn`] wraps a closure.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{HttpError, Result};
use crate::request::Request;

/// Part of the request a schema applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationTarget {
    Query,
    Params,
    Body,
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Query => "query",
            Self::Params => "params",
            Self::Body => "body",
        };
        f.write_str(name)
    }
}

/// A schema check against one part of the request.
pub trait Schema: Send + Sync {
    /// Validate `value`, returning the engine's diagnostic message on failure.
    fn validate(&self, value: &Value) -> std::result::Result<(), String>;
}

/// Schema satisfied by any value that deserializes into `T`.
///
/// Query and path parameters are always strings, so types used against
/// those targets should declare string fields.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Schema for Typed<T> {
    fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        T::deserialize(value).map(|_| ()).map_err(|e| e.to_string())
    }
}

/// Schema backed by a closure. Created with [`schema_fn`].
pub struct FnSchema<F>(F);

/// Wrap a closure as a [`Schema`].
pub fn schema_fn<F>(check: F) -> FnSchema<F>
where
    F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync,
{
    FnSchema(check)
}

impl<F> Schema for FnSchema<F>
where
    F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        (self.0)(value)
    }
}

/// Schemas applied to a request before middleware runs.
///
/// Targets are checked in a fixed order: query, then params, then body. The
/// first failure is reported; later targets are not checked. A target with no
/// schema always passes.
#[derive(Clone, Default)]
pub struct ValidationRules {
    query: Option<Arc<dyn Schema>>,
    params: Option<Arc<dyn Schema>>,
    body: Option<Arc<dyn Schema>>,
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema for the query-string parameters.
    pub fn query(mut self, schema: impl Schema + 'static) -> Self {
        self.query = Some(Arc::new(schema));
        self
    }

    /// Schema for the path parameters.
    pub fn params(mut self, schema: impl Schema + 'static) -> Self {
        self.params = Some(Arc::new(schema));
        self
    }

    /// Schema for the decoded body.
    pub fn body(mut self, schema: impl Schema + 'static) -> Self {
        self.body = Some(Arc::new(schema));
        self
    }

    /// Whether no schema is configured.
    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.params.is_none() && self.body.is_none()
    }

    /// Run every configured schema against `request`.
    pub fn check(&self, request: &Request) -> Result<()> {
        if let Some(schema) = &self.query {
            run(ValidationTarget::Query, schema.as_ref(), &to_object(request.query()))?;
        }
        if let Some(schema) = &self.params {
            run(ValidationTarget::Params, schema.as_ref(), &to_object(request.params()))?;
        }
        if let Some(schema) = &self.body {
            run(ValidationTarget::Body, schema.as_ref(), request.body())?;
        }
        Ok(())
    }
}

impl fmt::Debug for ValidationRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRules")
            .field("query", &self.query.is_some())
            .field("params", &self.params.is_some())
            .field("body", &self.body.is_some())
            .finish()
    }
}

fn run(target: ValidationTarget, schema: &dyn Schema, value: &Value) -> Result<()> {
    debug!(target = %target, "validating request");
    schema
        .validate(value)
        .map_err(|message| HttpError::Validation { target, message })
}

fn to_object(map: &HashMap<String, String>) -> Value {
    let fields: Map<String, Value> = map
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(fields)
}
