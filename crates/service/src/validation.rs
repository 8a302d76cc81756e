//! Inbound body validation.
//!
//! Decoding alone is not enough: request records default their fields so a
//! partially populated object still decodes, and each required field is then
//! checked by name. Values are returned exactly as received.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request body is empty.")]
    EmptyBody,
    #[error("Invalid JSON format in request body.")]
    MalformedJson(String),
    #[error("The {0} field is required.")]
    MissingRequiredField(&'static str),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyBody => "EMPTY_BODY",
            ValidationError::MalformedJson(_) => "INVALID_JSON",
            ValidationError::MissingRequiredField(_) => "FIELD_REQUIRED",
        }
    }

    /// Field-keyed error list for the problem envelope.
    pub fn field_errors(&self) -> serde_json::Value {
        match self {
            ValidationError::EmptyBody => serde_json::json!({ "body": [self.to_string()] }),
            ValidationError::MalformedJson(reason) => serde_json::json!({ "body": [reason] }),
            ValidationError::MissingRequiredField(name) => {
                let mut map = serde_json::Map::new();
                map.insert((*name).to_string(), serde_json::json!([self.to_string()]));
                serde_json::Value::Object(map)
            }
        }
    }
}

/// Implemented by request records that have required fields.
pub trait RequiredFields {
    /// `(wire name, value)` pairs, in the order they should be checked.
    fn required_fields(&self) -> Vec<(&'static str, &str)>;
}

/// Decode `raw` into `T` and check its required fields one by one.
pub fn validate<T>(raw: &[u8]) -> Result<T, ValidationError>
where
    T: DeserializeOwned + RequiredFields,
{
    if raw.iter().all(u8::is_ascii_whitespace) {
        warn!("request body is empty");
        return Err(ValidationError::EmptyBody);
    }

    let value: T = serde_json::from_slice(raw).map_err(|e| {
        warn!(error = %e, "failed to deserialize request body");
        ValidationError::MalformedJson(e.to_string())
    })?;

    if let Some((name, _)) = value
        .required_fields()
        .into_iter()
        .find(|(_, v)| v.trim().is_empty())
    {
        warn!(field = name, "required field missing");
        return Err(ValidationError::MissingRequiredField(name));
    }

    Ok(value)
}
