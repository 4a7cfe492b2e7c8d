//! Request normalization
//!
//! Upstream parsers sometimes fall back to returning descriptive text instead
//! of a structured result. [`normalize`] is the single place that checks which
//! one it got; everything downstream only ever sees a [`ValidatedRequest`].

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::ops::Deref;
use tracing::{debug, warn};

use crate::error::ValidationError;

/// Raw output of an upstream parser
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult<T> {
    /// A structured object of the handler's request type
    Structured(T),
    /// Diagnostic text returned in place of a structured result
    Diagnostic(String),
}

impl<T: DeserializeOwned> ParseResult<T> {
    /// Classify an untyped parser value.
    ///
    /// A JSON string is diagnostic text, a JSON object is decoded into `T`,
    /// and anything else is rejected as an unexpected shape.
    pub fn from_value(value: JsonValue) -> Result<Self, ValidationError> {
        match value {
            JsonValue::String(text) => Ok(Self::Diagnostic(text)),
            JsonValue::Object(_) => serde_json::from_value(value)
                .map(Self::Structured)
                .map_err(|e| ValidationError::Schema(e.to_string())),
            other => Err(ValidationError::UnexpectedShape(
                json_kind(&other).to_string(),
            )),
        }
    }
}

/// Schema check applied to a structured request before it is accepted
pub trait RequestSchema {
    /// Return a description of the first violated constraint, if any
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A request that passed shape and schema validation
///
/// Only [`normalize`] constructs this type, and only this type (not the raw
/// parser output) is serializable downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest<T>(T);

impl<T> ValidatedRequest<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for ValidatedRequest<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Serialize> Serialize for ValidatedRequest<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Turn a parse result into a validated request
pub fn normalize<T: RequestSchema>(
    raw: ParseResult<T>,
) -> Result<ValidatedRequest<T>, ValidationError> {
    match raw {
        ParseResult::Structured(request) => {
            request.validate().map_err(|reason| {
                debug!("Structured request rejected: {}", reason);
                ValidationError::Schema(reason)
            })?;
            Ok(ValidatedRequest(request))
        }
        ParseResult::Diagnostic(text) => {
            warn!("Parser returned diagnostic text instead of a request: {}", text);
            Err(ValidationError::Diagnostic(text))
        }
    }
}

/// Classify and normalize an untyped parser value in one step
pub fn normalize_value<T>(raw: JsonValue) -> Result<ValidatedRequest<T>, ValidationError>
where
    T: RequestSchema + DeserializeOwned,
{
    normalize(ParseResult::from_value(raw)?)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
