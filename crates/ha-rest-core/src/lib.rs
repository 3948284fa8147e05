//! Core types for the Home Assistant REST client
//!
//! This crate holds everything that does not touch the network: host
//! validation, the in-memory credential, the request descriptor with its
//! query-string builder, one request builder per REST endpoint, and the
//! response models. The `ha-rest-client` crate executes these requests.

mod credential;
pub mod endpoints;
mod error;
mod host;
pub mod models;
mod query;
mod request;

pub use credential::Credential;
pub use endpoints::{HistoryQuery, LogbookQuery, ServiceCall, StateChange};
pub use error::{InputError, InputResult};
pub use host::{Host, DEFAULT_PORT, HOMEASSISTANT_LOCAL};
pub use models::{EntityState, ServerInfo};
pub use query::QueryString;
pub use request::{ApiRequest, Method};

/// Greeting returned by `GET /api/` on a running server
pub const API_RUNNING_MESSAGE: &str = "API running.";
