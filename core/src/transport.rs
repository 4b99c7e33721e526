//! The seam between the client and the network.
//!
//! # Design
//! `Transport` executes one fully built `HttpRequest` and returns the raw
//! response. It does not interpret status codes or bodies. Cookie and auth
//! state are already on the request's headers when it arrives, so a
//! transport only has to move bytes. `UreqTransport` is the blocking
//! implementation used in production; tests substitute their own.

use std::fmt;
use std::time::Duration;

use tracing::warn;
use ureq::http;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, Body, RequestBuilder};

use crate::error::RestError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes a single blocking HTTP round-trip.
pub trait Transport {
    /// Send `request`. Any failure before a response arrives, timeouts
    /// included, is reported as `RestError::Transport`.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RestError>;
}

/// `Transport` backed by a `ureq` agent.
///
/// Status codes are returned as data, never as errors, and non-standard
/// methods are allowed so custom verbs reach the wire. Response bodies are
/// read whole with no size cap unless one is set with `with_body_limit`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    body_limit: u64,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Agent with a global per-call timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .allow_non_standard_methods(true)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Refuse response bodies larger than `limit` bytes.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RestError> {
        let url = request.url.as_str();
        let body = request.body.as_deref();
        let result = match (&request.method, body) {
            (HttpMethod::Get, _) => call(self.agent.get(url), request),
            (HttpMethod::Head, _) => call(self.agent.head(url), request),
            (HttpMethod::Options, _) => call(self.agent.options(url), request),
            (HttpMethod::Delete, None) => call(self.agent.delete(url), request),
            (HttpMethod::Delete, Some(body)) => {
                send(self.agent.delete(url).force_send_body(), request, Some(body))
            }
            (HttpMethod::Post, body) => send(self.agent.post(url), request, body),
            (HttpMethod::Put, body) => send(self.agent.put(url), request, body),
            (HttpMethod::Patch, body) => send(self.agent.patch(url), request, body),
            (HttpMethod::Custom(method), body) => self.run_custom(method, request, body),
        };
        result
            .and_then(|response| into_response(response, self.body_limit))
            .map_err(|e| {
                warn!(method = %request.method, url, error = %e, "transport failure");
                transport_error(e)
            })
    }
}

impl UreqTransport {
    fn run_custom(
        &self,
        method: &str,
        request: &HttpRequest,
        body: Option<&[u8]>,
    ) -> Result<http::Response<Body>, ureq::Error> {
        let method = http::Method::from_bytes(method.as_bytes())
            .map_err(|e| ureq::Error::Http(e.into()))?;
        let mut builder = http::Request::builder().method(method).uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let wire = builder
            .body(body.unwrap_or_default().to_vec())
            .map_err(ureq::Error::Http)?;
        self.agent.run(wire)
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn call(
    builder: RequestBuilder<WithoutBody>,
    request: &HttpRequest,
) -> Result<http::Response<Body>, ureq::Error> {
    with_headers(builder, request).call()
}

fn send(
    builder: RequestBuilder<WithBody>,
    request: &HttpRequest,
    body: Option<&[u8]>,
) -> Result<http::Response<Body>, ureq::Error> {
    let builder = with_headers(builder, request);
    match body {
        Some(body) => builder.send(body),
        None => builder.send_empty(),
    }
}

fn into_response(
    mut response: http::Response<Body>,
    body_limit: u64,
) -> Result<HttpResponse, ureq::Error> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = response
        .body_mut()
        .with_config()
        .limit(body_limit)
        .read_to_vec()?;
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

/// Keep ureq's message verbatim and name its error kind as the code.
fn transport_error(err: ureq::Error) -> RestError {
    let code = match &err {
        ureq::Error::Timeout(_) => "timeout",
        ureq::Error::HostNotFound => "host_not_found",
        ureq::Error::ConnectionFailed => "connection_failed",
        ureq::Error::Io(_) => "io",
        ureq::Error::BadUri(_) => "bad_uri",
        ureq::Error::Http(_) => "http",
        ureq::Error::StatusCode(_) => "status",
        ureq::Error::BodyExceedsLimit(_) => "body_limit",
        _ => "other",
    };
    RestError::Transport {
        code: code.to_string(),
        message: err.to_string(),
    }
}
