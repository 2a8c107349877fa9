//! HTTP transport abstraction.
//!
//! The actual HTTP client is abstracted via a trait so that hosts can plug
//! in whatever library they already carry (reqwest, ureq, curl bindings).
//! The core only builds requests and interprets status codes; connection
//! management, TLS, authentication, and timeouts belong to the implementor
//! and are configured once at construction.

use std::fmt;

/// HTTP verb used by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Read a resource.
    Get,
    /// Replace a resource.
    Put,
    /// Create a resource or sub-resource.
    Post,
    /// Remove a resource.
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A single outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Fully qualified URL including query string.
    pub url: String,
    /// Request body, if any. Always JSON text when present.
    pub body: Option<String>,
    /// Additional headers beyond whatever the transport sets globally.
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Creates a bodyless request.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Attaches a JSON body and the matching content-type header.
    #[must_use]
    pub fn with_json_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.headers
            .push(("Content-Type".into(), "application/json".into()));
        self
    }
}

/// A response as seen by the core.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual transport. An `Err` return
/// models a transport-level failure (connection refused, timeout, TLS
/// error); a completed exchange with a non-success status comes back as
/// `Ok` and is interpreted by the caller.
pub trait HttpClient {
    /// Executes one request and returns the response.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}
