//! Decoded response bodies

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::transport::RawResponse;

/// Body of a successful call
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Json(Value),
    /// Plain-text endpoints such as the error log and rendered templates
    Text(String),
    Empty,
}

impl ParsedResponse {
    /// Decode a 2xx response according to its content type
    ///
    /// A body that claims to be JSON but does not parse is reported as
    /// [`ClientError::Unknown`] with the response status.
    pub(crate) fn from_raw(raw: RawResponse) -> ClientResult<Self> {
        if raw.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ParsedResponse::Empty);
        }

        let content_type = raw.content_type.as_deref().unwrap_or_default();
        if content_type.contains("json") {
            return serde_json::from_slice(&raw.body)
                .map(ParsedResponse::Json)
                .map_err(|e| ClientError::Unknown {
                    status: Some(raw.status),
                    message: format!("invalid JSON in response: {}", e),
                });
        }

        if content_type.is_empty() {
            if let Ok(value) = serde_json::from_slice(&raw.body) {
                return Ok(ParsedResponse::Json(value));
            }
        }

        Ok(ParsedResponse::Text(raw.text().into_owned()))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParsedResponse::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParsedResponse::Text(text) => Some(text),
            _ => None,
        }
    }

    /// JSON value of the body; text becomes a JSON string, empty becomes null
    pub fn into_json(self) -> Value {
        match self {
            ParsedResponse::Json(value) => value,
            ParsedResponse::Text(text) => Value::String(text),
            ParsedResponse::Empty => Value::Null,
        }
    }

    /// Text of the body; JSON is re-encoded, empty becomes ""
    pub fn into_text(self) -> String {
        match self {
            ParsedResponse::Json(Value::String(text)) | ParsedResponse::Text(text) => text,
            ParsedResponse::Json(value) => value.to_string(),
            ParsedResponse::Empty => String::new(),
        }
    }

    /// Deserialize a JSON body into a typed model
    pub fn deserialize<T: DeserializeOwned>(self) -> ClientResult<T> {
        serde_json::from_value(self.into_json()).map_err(|e| ClientError::Unknown {
            status: None,
            message: format!("unexpected response shape: {}", e),
        })
    }
}
