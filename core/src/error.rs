//! Error types for the REST client.
//!
//! # Design
//! One enum covers configuration, encoding, transport, and decoding failures
//! so `execute` has a single error type. `Transport` carries the transport's
//! own error code and message untouched; the core never retries.

use thiserror::Error;

/// Errors returned by `RestClient` and the pieces it orchestrates.
#[derive(Debug, Error)]
pub enum RestError {
    /// The verb name is not one of the recognized verbs.
    #[error("unknown REST verb: {0}")]
    UnknownVerb(String),

    /// The target URL could not be parsed at configuration time.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// `execute` was called before `configure`.
    #[error("request is not configured, call configure() first")]
    NotConfigured,

    /// No codec is registered for the content-type tag.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The parameter set could not be encoded into a request body.
    #[error("encoding failed: {0}")]
    Encode(String),

    /// The response body is malformed for the resolved codec.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// The transport failed before a response was received.
    #[error("transport error ({code}): {message}")]
    Transport { code: String, message: String },

    /// The server returned a non-2xx status and the client was asked to fail on it.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The cookie store could not be created, read, or written.
    #[error("cookie store: {0}")]
    CookieStore(#[from] std::io::Error),
}
