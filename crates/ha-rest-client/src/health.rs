//! Liveness probe against the API root

use ha_rest_core::{Credential, Method, API_RUNNING_MESSAGE};
use serde_json::Value;

use crate::transport::{HttpRequest, RawResponse, Transport, TransportError};

/// Result of probing `GET /api/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    /// The server answered with the `API running.` greeting
    Alive,
    /// The server answered, but not with the greeting; holds the raw body
    Unexpected(String),
}

impl Health {
    pub fn is_alive(&self) -> bool {
        matches!(self, Health::Alive)
    }
}

/// Probe the API root with the session's token
///
/// Only a transport failure is an `Err`; any response, whatever its status,
/// is reported as [`Health`].
pub(crate) fn check<T: Transport>(
    transport: &T,
    base_url: &str,
    credential: &Credential,
) -> Result<Health, TransportError> {
    let authorization = credential.authorization();
    let probe = HttpRequest {
        method: Method::Get,
        url: base_url,
        authorization: &authorization,
        body: None,
    };
    let outcome = transport.execute(&probe);
    drop(authorization);
    let response = outcome?;

    match greeting(&response) {
        Some(message) if message.eq_ignore_ascii_case(API_RUNNING_MESSAGE) => Ok(Health::Alive),
        _ => Ok(Health::Unexpected(response.text().into_owned())),
    }
}

/// Extract the greeting: the JSON `message` field, or a bare text body
pub(crate) fn greeting(response: &RawResponse) -> Option<String> {
    match serde_json::from_slice::<Value>(&response.body) {
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map(|m| m.trim().to_string()),
        Ok(Value::String(text)) => Some(text.trim().to_string()),
        Ok(_) => None,
        Err(_) => Some(response.text().trim().to_string()),
    }
}
