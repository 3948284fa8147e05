//! Request descriptor passed from endpoint builders to the dispatcher

use std::fmt;

use crate::query::QueryString;

/// HTTP methods used by the REST API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single REST call, relative to the `/api/` base URL
///
/// Built per call and dropped once the response is classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below `/api/`, without a leading slash (e.g. `states/light.kitchen`)
    pub path: String,
    pub query: QueryString,
    /// JSON-encoded body, only sent with POST
    pub body: Option<String>,
}

impl ApiRequest {
    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: QueryString::new(),
            body: None,
        }
    }

    /// Create a POST request with an optional JSON body
    pub fn post(path: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: QueryString::new(),
            body,
        }
    }

    /// Replace the query string
    pub fn with_query(mut self, query: QueryString) -> Self {
        self.query = query;
        self
    }

    /// Path followed by the rendered query string
    pub fn path_and_query(&self) -> String {
        format!("{}{}", self.path, self.query)
    }

    /// Full URL: base URL, path, then query
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}{}", base_url, self.path, self.query)
    }

    /// Body to send on the wire; GET never carries one
    pub fn payload(&self) -> Option<&str> {
        match self.method {
            Method::Get => None,
            Method::Post => self.body.as_deref(),
        }
    }
}
