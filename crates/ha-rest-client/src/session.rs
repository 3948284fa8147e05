//! Session state: base URL and credential of the connected server

use std::io::Write;

use ha_rest_core::{ApiRequest, Credential, Host, InputError, Method, ServerInfo};
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::dispatch;
use crate::error::{ClientError, ClientResult};
use crate::health::{self, Health};
use crate::response::ParsedResponse;
use crate::transport::{HttpRequest, HttpTransport, Transport, TransportError};

/// Base URL and token of a validated server
pub(crate) struct Connection {
    pub(crate) base_url: String,
    pub(crate) credential: Credential,
}

/// A client session against one Home Assistant server
///
/// The session starts disconnected. [`Session::connect`] validates the
/// server and token and stores them; every API call made while
/// disconnected fails with [`ClientError::NotConnected`] without touching
/// the network. A failed connect leaves the session disconnected.
pub struct Session<T: Transport = HttpTransport> {
    transport: T,
    connection: Option<Connection>,
}

impl Session<HttpTransport> {
    /// Create a disconnected session with the default HTTP transport
    pub fn new() -> ClientResult<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a disconnected session with a configured HTTP transport
    pub fn with_config(config: &ClientConfig) -> ClientResult<Self> {
        let transport = HttpTransport::new(config).map_err(|e| InputError::InvalidValue {
            field: "client_config",
            reason: e.to_string(),
        })?;
        Ok(Self::with_transport(transport))
    }
}

impl<T: Transport> Session<T> {
    /// Create a disconnected session over any transport
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            connection: None,
        }
    }

    /// Connect to `http://{host}:{port}/api/` and validate the token
    ///
    /// `host` must be an IPv4 literal or `homeassistant.local`. Invalid
    /// input is rejected before any request and leaves the session as it
    /// was. Otherwise any previous connection is dropped, and only a
    /// `200` greeting from the server establishes the new one.
    #[instrument(skip(self, token))]
    pub fn connect(&mut self, host: &str, port: u16, token: &str) -> ClientResult<ServerInfo> {
        let host: Host = host.parse()?;
        let credential = Credential::new(token)?;
        let base_url = host.base_url(port);

        self.connection = None;

        match self.validate(&base_url, &credential) {
            Ok(info) => {
                info!(base_url = %base_url, message = %info.message, "Connected to Home Assistant");
                self.connection = Some(Connection {
                    base_url,
                    credential,
                });
                Ok(info)
            }
            Err((message, source)) => {
                warn!(base_url = %base_url, error = %message, "Connection failed");
                Err(ClientError::ConnectionFailed {
                    base_url,
                    message,
                    source,
                })
            }
        }
    }

    fn validate(
        &self,
        base_url: &str,
        credential: &Credential,
    ) -> Result<ServerInfo, (String, Option<TransportError>)> {
        let authorization = credential.authorization();
        let probe = HttpRequest {
            method: Method::Get,
            url: base_url,
            authorization: &authorization,
            body: None,
        };
        let outcome = self.transport.execute(&probe);
        drop(authorization);
        let response = outcome.map_err(|e| (e.to_string(), Some(e)))?;

        if response.status != 200 {
            return Err((
                format!("server returned HTTP {}: {}", response.status, response.text().trim()),
                None,
            ));
        }

        match health::greeting(&response) {
            Some(message) if !message.is_empty() => Ok(ServerInfo { message }),
            _ => Err((
                format!("malformed greeting: {}", response.text().trim()),
                None,
            )),
        }
    }

    /// Forget the server and token; calling it again is a no-op
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            debug!(base_url = %connection.base_url, "Disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Base URL of the connected server, ending in `/api/`
    pub fn base_url(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.base_url.as_str())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn connection(&self) -> ClientResult<&Connection> {
        self.connection.as_ref().ok_or(ClientError::NotConnected)
    }

    /// Execute a raw request against the connected server
    pub fn dispatch(&self, request: &ApiRequest) -> ClientResult<ParsedResponse> {
        let connection = self.connection()?;
        dispatch::dispatch(&self.transport, connection, request)
    }

    /// Execute a request, streaming the successful body into `sink`
    pub fn download(&self, request: &ApiRequest, sink: &mut dyn Write) -> ClientResult<u64> {
        let connection = self.connection()?;
        dispatch::download(&self.transport, connection, request, sink)
    }

    /// Probe the API root of the connected server
    pub fn health_check(&self) -> ClientResult<Health> {
        let connection = self.connection()?;
        health::check(&self.transport, &connection.base_url, &connection.credential).map_err(|e| {
            ClientError::ServerUnreachable {
                message: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::testing::ScriptedTransport;
    use ha_rest_core::endpoints;

    fn connected() -> Session<ScriptedTransport> {
        let mut session = Session::with_transport(ScriptedTransport::new().alive());
        session.connect("192.168.1.10", 8123, "tok123").unwrap();
        session
    }

    #[test]
    fn test_connect_success() {
        let mut session = Session::with_transport(ScriptedTransport::new().alive());
        assert!(!session.is_connected());

        let info = session.connect("192.168.1.10", 8123, "tok123").unwrap();
        assert_eq!(info.message, "API running.");
        assert!(session.is_connected());
        assert_eq!(session.base_url(), Some("http://192.168.1.10:8123/api/"));

        let requests = session.transport().requests.borrow();
        assert_eq!(requests[0].url, "http://192.168.1.10:8123/api/");
        assert_eq!(requests[0].authorization, "Bearer tok123");
    }

    #[test]
    fn test_invalid_host_makes_no_request() {
        for host in ["localhost", "example.com", "192.168.1", "", "homeassistant"] {
            let mut session = Session::with_transport(ScriptedTransport::new().alive());
            let err = session.connect(host, 8123, "tok123").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{host:?}");
            assert_eq!(session.transport().request_count(), 0);
            assert!(!session.is_connected());
        }
    }

    #[test]
    fn test_empty_token_makes_no_request() {
        let mut session = Session::with_transport(ScriptedTransport::new().alive());
        let err = session.connect("homeassistant.local", 8123, "  ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(session.transport().request_count(), 0);
    }

    #[test]
    fn test_invalid_input_keeps_existing_connection() {
        let mut session = connected();
        assert!(session.connect("not-a-host", 8123, "tok123").is_err());
        assert!(session.is_connected());
    }

    #[test]
    fn test_failed_connect_clears_previous_session() {
        let transport = ScriptedTransport::new().alive().fail("connection refused");
        let mut session = Session::with_transport(transport);
        session.connect("192.168.1.10", 8123, "tok123").unwrap();

        let err = session.connect("192.168.1.11", 8123, "tok456").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert!(!session.is_connected());
        assert_eq!(session.base_url(), None);
        assert_eq!(
            session.dispatch(&endpoints::config()).unwrap_err().kind(),
            ErrorKind::NotConnected
        );
    }

    #[test]
    fn test_non_200_connect_fails() {
        let mut session = Session::with_transport(
            ScriptedTransport::new().json(401, r#"{"message": "401: Unauthorized"}"#),
        );
        let err = session.connect("192.168.1.10", 8123, "bad").unwrap_err();
        assert!(matches!(err, ClientError::ConnectionFailed { source: None, .. }));
        assert!(err.to_string().contains("HTTP 401"));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_malformed_greeting_fails() {
        let mut session = Session::with_transport(ScriptedTransport::new().json(200, "[1, 2, 3]"));
        let err = session.connect("192.168.1.10", 8123, "tok123").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert!(err.to_string().contains("malformed greeting"));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut session = connected();
        session.disconnect();
        assert!(!session.is_connected());
        session.disconnect();
        assert!(!session.is_connected());
        assert_eq!(session.base_url(), None);
    }

    #[test]
    fn test_not_connected_fails_fast() {
        let session = Session::with_transport(ScriptedTransport::new());
        let err = session.dispatch(&endpoints::config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
        assert_eq!(session.transport().request_count(), 0);

        let mut sink = Vec::new();
        let request = endpoints::camera_proxy("camera.door", None).unwrap();
        assert_eq!(
            session.download(&request, &mut sink).unwrap_err().kind(),
            ErrorKind::NotConnected
        );
        assert_eq!(session.health_check().unwrap_err().kind(), ErrorKind::NotConnected);
        assert_eq!(session.transport().request_count(), 0);
    }

    #[test]
    fn test_health_check_probe() {
        let mut session = Session::with_transport(
            ScriptedTransport::new()
                .alive()
                .alive()
                .reply(200, "text/plain", "maintenance"),
        );
        session.connect("192.168.1.10", 8123, "tok123").unwrap();
        assert_eq!(session.health_check().unwrap(), Health::Alive);
        assert_eq!(
            session.health_check().unwrap(),
            Health::Unexpected("maintenance".to_string())
        );
        assert_eq!(
            session.health_check().unwrap_err().kind(),
            ErrorKind::ServerUnreachable
        );
    }
}
