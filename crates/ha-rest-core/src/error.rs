//! Input errors raised before any request is built

use thiserror::Error;

/// Result type for request construction
pub type InputResult<T> = Result<T, InputError>;

/// Errors caught while validating caller-supplied parameters
///
/// None of these ever reach the network layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    /// Host is neither a dotted IPv4 literal nor `homeassistant.local`
    #[error("invalid host '{host}': expected an IPv4 address or 'homeassistant.local'")]
    InvalidHost { host: String },

    /// Bearer token is empty or whitespace
    #[error("access token cannot be empty")]
    EmptyToken,

    /// A required parameter is empty
    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },

    /// No domain given and none could be derived from the entity id
    #[error("cannot determine service domain for '{service}': pass a domain or a 'domain.object' entity id")]
    MissingDomain { service: String },

    /// Parameter value could not be encoded into a request
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
