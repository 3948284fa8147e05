//! Mock Home Assistant server for integration tests
//!
//! The client is blocking, so the mock server lives on its own tokio
//! runtime and tests call the client from the plain test thread.

#![allow(dead_code)]

use ha_rest_client::Session;
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "tok123";

pub struct MockHa {
    // Dropped before the runtime that serves it
    pub server: MockServer,
    runtime: Runtime,
}

impl MockHa {
    pub fn start() -> Self {
        let runtime = Runtime::new().expect("failed to start tokio runtime");
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    /// Start a server that already answers the greeting for [`TOKEN`]
    pub fn running() -> Self {
        let ha = Self::start();
        ha.mount(greeting());
        ha
    }

    pub fn port(&self) -> u16 {
        self.server.address().port()
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub fn received(&self) -> Vec<Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    /// Requests received for anything other than the API root
    pub fn received_calls(&self) -> Vec<Request> {
        self.received()
            .into_iter()
            .filter(|r| r.url.path() != "/api/")
            .collect()
    }

    pub fn verify(&self) {
        self.runtime.block_on(self.server.verify());
    }

    /// A session connected to this server with [`TOKEN`]
    pub fn session(&self) -> Session {
        let mut session = Session::new().expect("failed to build session");
        session
            .connect("127.0.0.1", self.port(), TOKEN)
            .expect("connect to mock server");
        session
    }
}

/// `GET /api/` answering the running greeting
pub fn greeting() -> Mock {
    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(header("authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "API running."})))
}

/// A port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}
