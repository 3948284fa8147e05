//! HTTP transport used by the session
//!
//! The [`Transport`] trait is the seam between request dispatch and the
//! wire. [`HttpTransport`] implements it with a blocking `reqwest` client.

use std::borrow::Cow;
use std::io::{self, Write};

use ha_rest_core::Method;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use thiserror::Error;

use crate::config::ClientConfig;

/// Errors raised below the dispatcher (DNS, refused connection, timeout...)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("authorization header contains invalid characters")]
    InvalidHeader,

    #[error("{0}")]
    Other(String),
}

/// A fully resolved HTTP call
///
/// `authorization` borrows the per-call header value owned by the
/// dispatcher, so it lives exactly as long as the call.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub authorization: &'a str,
    pub body: Option<&'a str>,
}

/// Status, content type and body of a received response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Outcome of a streamed download
#[derive(Debug)]
pub enum Streamed {
    /// 2xx response; this many bytes were written to the sink
    Written(u64),
    /// Non-2xx response, buffered for classification; nothing was written
    Rejected(RawResponse),
    /// 2xx response, but the sink refused a write
    SinkFailed(io::Error),
}

/// Keeps the first error raised by the wrapped sink
///
/// `reqwest` folds writer errors into its own error type while copying a
/// body, which would make a full disk look like a network failure.
struct TrackedSink<'a> {
    inner: &'a mut dyn Write,
    error: Option<io::Error>,
}

impl<'a> TrackedSink<'a> {
    fn new(inner: &'a mut dyn Write) -> Self {
        Self { inner, error: None }
    }

    fn track(&mut self, err: io::Error) -> io::Error {
        let relayed = io::Error::new(err.kind(), err.to_string());
        self.error.get_or_insert(err);
        relayed
    }
}

impl Write for TrackedSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.write(buf) {
            Ok(n) => Ok(n),
            Err(err) => Err(self.track(err)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.flush() {
            Ok(()) => Ok(()),
            Err(err) => Err(self.track(err)),
        }
    }
}

/// Executes HTTP calls for the dispatcher
pub trait Transport {
    /// Send a request and buffer the whole response
    fn execute(&self, request: &HttpRequest<'_>) -> Result<RawResponse, TransportError>;

    /// Send a request and stream a successful body into `sink`
    fn download(
        &self,
        request: &HttpRequest<'_>,
        sink: &mut dyn Write,
    ) -> Result<Streamed, TransportError>;
}

/// Blocking `reqwest` transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport from configuration
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    fn prepare(&self, request: &HttpRequest<'_>) -> Result<RequestBuilder, TransportError> {
        let mut authorization =
            HeaderValue::from_str(request.authorization).map_err(|_| TransportError::InvalidHeader)?;
        authorization.set_sensitive(true);

        let builder = match request.method {
            Method::Get => self.client.get(request.url),
            Method::Post => self.client.post(request.url),
        }
        .header(AUTHORIZATION, authorization);

        Ok(match request.body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string()),
            None => builder,
        })
    }

    fn buffer(response: Response) -> Result<RawResponse, TransportError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes()?.to_vec();

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &HttpRequest<'_>) -> Result<RawResponse, TransportError> {
        let response = self.prepare(request)?.send()?;
        Self::buffer(response)
    }

    fn download(
        &self,
        request: &HttpRequest<'_>,
        sink: &mut dyn Write,
    ) -> Result<Streamed, TransportError> {
        let mut response = self.prepare(request)?.send()?;
        if !response.status().is_success() {
            return Ok(Streamed::Rejected(Self::buffer(response)?));
        }

        let mut tracked = TrackedSink::new(sink);
        match response.copy_to(&mut tracked) {
            Ok(bytes) => Ok(Streamed::Written(bytes)),
            Err(err) => match tracked.error.take() {
                Some(local) => Ok(Streamed::SinkFailed(local)),
                None => Err(err.into()),
            },
        }
    }
}
