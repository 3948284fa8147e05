//! Blocking client for the Home Assistant REST API
//!
//! A [`Session`] is connected once with a host, port and long-lived access
//! token, then used for every endpoint call:
//!
//! ```no_run
//! use ha_rest_client::{ServiceCall, Session};
//!
//! # fn main() -> Result<(), ha_rest_client::ClientError> {
//! let mut session = Session::new()?;
//! session.connect("192.168.1.10", 8123, "long-lived-token")?;
//!
//! let temp = session.state("sensor.temp")?;
//! println!("{} is {}", temp.entity_id, temp.state);
//!
//! session.call_service(&ServiceCall::new("turn_on").entity_id("light.kitchen"))?;
//! # Ok(())
//! # }
//! ```
//!
//! # Failure classification
//!
//! When a call fails, the session probes `GET /api/` before reporting:
//!
//! ```text
//! call fails ──► health check ──► fails / wrong greeting ──► ServerUnreachable
//!                      │
//!                      └──► "API running." ──► 400 BadRequest
//!                                              401 Unauthorized
//!                                              404 NotFound
//!                                              405 MethodNotAllowed
//!                                              *   Unknown
//! ```

mod api;
mod config;
mod dispatch;
mod error;
mod health;
mod response;
mod session;
pub mod transport;

pub use api::{Confirm, StateWrite};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use health::Health;
pub use response::ParsedResponse;
pub use session::Session;
pub use transport::{HttpTransport, Transport};

pub use ha_rest_core::{
    endpoints, models, ApiRequest, EntityState, HistoryQuery, LogbookQuery, Method, ServerInfo,
    ServiceCall, StateChange, DEFAULT_PORT,
};
