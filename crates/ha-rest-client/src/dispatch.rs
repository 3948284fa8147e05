//! Request dispatch and two-step failure classification
//!
//! A failed call (transport error or non-2xx status) is never returned as
//! is. The dispatcher first probes the API root: if that probe fails too,
//! the server is reported unreachable; if the server is alive, the original
//! status is mapped onto [`ClientError`].

use std::io::Write;

use ha_rest_core::ApiRequest;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::health::{self, Health};
use crate::response::ParsedResponse;
use crate::session::Connection;
use crate::transport::{HttpRequest, RawResponse, Streamed, Transport, TransportError};

/// Longest server-provided text carried in an error message
const MAX_DETAIL_LEN: usize = 512;

/// Why the original call failed
enum Failure {
    Status(RawResponse),
    Transport(TransportError),
}

impl Failure {
    fn status(&self) -> Option<u16> {
        match self {
            Failure::Status(response) => Some(response.status),
            Failure::Transport(_) => None,
        }
    }

    /// Server-provided detail: the JSON `message` field, else the raw text
    fn detail(&self) -> String {
        match self {
            Failure::Status(response) => {
                let detail = match serde_json::from_slice::<Value>(&response.body) {
                    Ok(Value::Object(map)) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .map(String::from),
                    _ => None,
                }
                .unwrap_or_else(|| response.text().trim().to_string());

                if detail.is_empty() {
                    format!("HTTP {}", response.status)
                } else {
                    truncate(detail)
                }
            }
            Failure::Transport(err) => err.to_string(),
        }
    }
}

/// Execute a request against the connected server
pub(crate) fn dispatch<T: Transport>(
    transport: &T,
    connection: &Connection,
    request: &ApiRequest,
) -> ClientResult<ParsedResponse> {
    let url = request.url(&connection.base_url);
    debug!(method = %request.method, path = %request.path_and_query(), "Dispatching request");

    let authorization = connection.credential.authorization();
    let call = HttpRequest {
        method: request.method,
        url: &url,
        authorization: &authorization,
        body: request.payload(),
    };
    let outcome = transport.execute(&call);
    drop(authorization);

    match outcome {
        Ok(response) if response.is_success() => ParsedResponse::from_raw(response),
        Ok(response) => Err(classify(transport, connection, request, Failure::Status(response))),
        Err(err) => Err(classify(transport, connection, request, Failure::Transport(err))),
    }
}

/// Execute a request, streaming a successful body into `sink`
///
/// Returns the number of bytes written.
pub(crate) fn download<T: Transport>(
    transport: &T,
    connection: &Connection,
    request: &ApiRequest,
    sink: &mut dyn Write,
) -> ClientResult<u64> {
    let url = request.url(&connection.base_url);
    debug!(method = %request.method, path = %request.path_and_query(), "Dispatching download");

    let authorization = connection.credential.authorization();
    let call = HttpRequest {
        method: request.method,
        url: &url,
        authorization: &authorization,
        body: request.payload(),
    };
    let outcome = transport.download(&call, sink);
    drop(authorization);

    match outcome {
        Ok(Streamed::Written(bytes)) => Ok(bytes),
        Ok(Streamed::SinkFailed(source)) => {
            warn!(path = %request.path_and_query(), error = %source, "Download sink failed");
            Err(ClientError::Io { path: None, source })
        }
        Ok(Streamed::Rejected(response)) => {
            Err(classify(transport, connection, request, Failure::Status(response)))
        }
        Err(err) => Err(classify(transport, connection, request, Failure::Transport(err))),
    }
}

fn classify<T: Transport>(
    transport: &T,
    connection: &Connection,
    request: &ApiRequest,
    failure: Failure,
) -> ClientError {
    let detail = failure.detail();

    let err = match health::check(transport, &connection.base_url, &connection.credential) {
        Ok(Health::Alive) => ClientError::from_status(failure.status(), detail),
        Ok(Health::Unexpected(body)) => ClientError::ServerUnreachable {
            message: format!(
                "{}; health check returned an unexpected response: {}",
                detail,
                truncate(body)
            ),
        },
        Err(health_err) => ClientError::ServerUnreachable {
            message: format!("{}; health check failed: {}", detail, health_err),
        },
    };

    warn!(
        method = %request.method,
        path = %request.path_and_query(),
        kind = ?err.kind(),
        status = ?failure.status(),
        "Request failed"
    );
    err
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_DETAIL_LEN {
        let mut end = MAX_DETAIL_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::testing::ScriptedTransport;
    use ha_rest_core::{endpoints, Credential, Method};

    const BASE: &str = "http://192.168.1.10:8123/api/";

    fn connection() -> Connection {
        Connection {
            base_url: BASE.to_string(),
            credential: Credential::new("tok123").unwrap(),
        }
    }

    fn state_request() -> ApiRequest {
        endpoints::states(Some("sensor.temp")).unwrap()
    }

    #[test]
    fn test_success_returns_json() {
        let transport = ScriptedTransport::new().json(200, r#"{"state": "21.5"}"#);
        let parsed = dispatch(&transport, &connection(), &state_request()).unwrap();

        assert_eq!(parsed.as_json().unwrap()["state"], "21.5");
        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://192.168.1.10:8123/api/states/sensor.temp");
        assert_eq!(requests[0].authorization, "Bearer tok123");
        assert_eq!(requests[0].body, None);
    }

    #[test]
    fn test_post_sends_body() {
        let transport = ScriptedTransport::new().reply(200, "text/plain", "on");
        let request = endpoints::render_template("{{ 1 }}").unwrap();
        let parsed = dispatch(&transport, &connection(), &request).unwrap();

        assert_eq!(parsed.as_text(), Some("on"));
        let requests = transport.requests.borrow();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"template":"{{ 1 }}"}"#));
    }

    #[test]
    fn test_status_classification_when_alive() {
        let cases = [
            (400, ErrorKind::BadRequest),
            (401, ErrorKind::Unauthorized),
            (404, ErrorKind::NotFound),
            (405, ErrorKind::MethodNotAllowed),
            (500, ErrorKind::Unknown),
        ];
        for (status, kind) in cases {
            let transport = ScriptedTransport::new()
                .json(status, r#"{"message": "detail"}"#)
                .alive();
            let err = dispatch(&transport, &connection(), &state_request()).unwrap_err();
            assert_eq!(err.kind(), kind, "status {}", status);
            assert_eq!(err.http_status(), Some(status));
            // Original call plus the health check
            assert_eq!(transport.request_count(), 2);
        }
    }

    #[test]
    fn test_unknown_carries_server_text() {
        let transport = ScriptedTransport::new()
            .reply(502, "text/plain", "Bad Gateway")
            .alive();
        let err = dispatch(&transport, &connection(), &state_request()).unwrap_err();
        match err {
            ClientError::Unknown { status, message } => {
                assert_eq!(status, Some(502));
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_health_check_failure_means_unreachable() {
        for status in [400, 401, 404, 405, 500] {
            let transport = ScriptedTransport::new()
                .json(status, "{}")
                .fail("connection reset by peer");
            let err = dispatch(&transport, &connection(), &state_request()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ServerUnreachable, "status {}", status);
            assert!(err.to_string().contains("connection reset by peer"));
        }
    }

    #[test]
    fn test_transport_failure_then_dead_server() {
        let transport = ScriptedTransport::new()
            .fail("connection refused")
            .fail("connection refused");
        let err = dispatch(&transport, &connection(), &state_request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerUnreachable);
        // The original transport error is part of the message
        assert!(err.to_string().starts_with("server unreachable: connection refused"));
    }

    #[test]
    fn test_transport_failure_with_live_server() {
        let transport = ScriptedTransport::new().fail("operation timed out").alive();
        let err = dispatch(&transport, &connection(), &state_request()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Unknown { status: None, ref message } if message == "operation timed out"
        ));
    }

    #[test]
    fn test_unexpected_health_body_means_unreachable() {
        let transport = ScriptedTransport::new()
            .json(404, "{}")
            .reply(503, "text/html", "<html>maintenance</html>");
        let err = dispatch(&transport, &connection(), &state_request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerUnreachable);
        assert!(err.to_string().contains("maintenance"));
    }

    #[test]
    fn test_download_writes_sink() {
        let transport = ScriptedTransport::new().reply(200, "image/jpeg", "\u{1}JPEG");
        let request = endpoints::camera_proxy("camera.door", None).unwrap();
        let mut sink = Vec::new();
        let written = download(&transport, &connection(), &request, &mut sink).unwrap();
        assert_eq!(written, 5);
        assert_eq!(sink, b"\x01JPEG");
    }

    #[test]
    fn test_download_rejected_is_classified() {
        let transport = ScriptedTransport::new()
            .json(404, r#"{"message": "Entity not found."}"#)
            .alive();
        let request = endpoints::camera_proxy("camera.missing", None).unwrap();
        let mut sink = Vec::new();
        let err = download(&transport, &connection(), &request, &mut sink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(sink.is_empty());
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "No space left on device",
            ))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_download_sink_failure_skips_health_check() {
        let transport = ScriptedTransport::new().reply(200, "image/jpeg", "jpeg-bytes");
        let request = endpoints::camera_proxy("camera.door", None).unwrap();
        let err = download(&transport, &connection(), &request, &mut FullDisk).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("No space left on device"));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_truncate_long_detail() {
        let text = "é".repeat(MAX_DETAIL_LEN);
        let truncated = truncate(text);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= MAX_DETAIL_LEN + 3);
    }
}
