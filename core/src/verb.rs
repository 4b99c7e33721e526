//! Abstract REST verbs and their mapping onto wire methods.
//!
//! # Design
//! Verbs are a closed enum. Names are validated once, when a verb is parsed
//! at configuration time; `dispatch` is a total function over the enum and
//! cannot fail. `Custom` carries its own wire token and picks query or body
//! mode from a caller flag.

use std::fmt;
use std::str::FromStr;

use crate::error::RestError;
use crate::http::HttpMethod;

/// Abstract REST operation, chosen independently of the wire method string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    /// Caller-defined wire method.
    Custom(String),
}

/// Where the parameter set goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Percent-encoded into the URL query string.
    Query,
    /// Encoded by the request codec into the body.
    Body,
}

/// Result of dispatching a verb: what to put on the wire and how to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub method: HttpMethod,
    pub mode: EncodeMode,
}

impl Verb {
    /// Build a custom verb, checking the method is a valid HTTP token.
    pub fn custom(method: &str) -> Result<Self, RestError> {
        if is_token(method) {
            Ok(Verb::Custom(method.to_string()))
        } else {
            Err(RestError::UnknownVerb(format!("custom:{method}")))
        }
    }

    /// Map the verb to its wire method and encoder mode.
    ///
    /// `custom_uses_body` only affects `Custom`.
    pub fn dispatch(&self, custom_uses_body: bool) -> Dispatch {
        let (method, mode) = match self {
            Verb::Get => (HttpMethod::Get, EncodeMode::Query),
            Verb::Post => (HttpMethod::Post, EncodeMode::Body),
            Verb::Put => (HttpMethod::Put, EncodeMode::Body),
            Verb::Patch => (HttpMethod::Patch, EncodeMode::Body),
            Verb::Delete => (HttpMethod::Delete, EncodeMode::Body),
            Verb::Head => (HttpMethod::Head, EncodeMode::Query),
            Verb::Options => (HttpMethod::Options, EncodeMode::Query),
            Verb::Custom(method) => {
                let mode = if custom_uses_body {
                    EncodeMode::Body
                } else {
                    EncodeMode::Query
                };
                (HttpMethod::Custom(method.clone()), mode)
            }
        };
        Dispatch { method, mode }
    }
}

impl FromStr for Verb {
    type Err = RestError;

    /// Parses `get`, `post`, `put`, `patch`, `delete`, `head`, `options`
    /// (any case) and `custom:<METHOD>`.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let verb = match name.to_ascii_lowercase().as_str() {
            "get" => Verb::Get,
            "post" => Verb::Post,
            "put" => Verb::Put,
            "patch" => Verb::Patch,
            "delete" => Verb::Delete,
            "head" => Verb::Head,
            "options" => Verb::Options,
            lower => match lower.strip_prefix("custom:") {
                // Keep the caller's spelling of the method token.
                Some(_) => return Verb::custom(&name["custom:".len()..]),
                None => return Err(RestError::UnknownVerb(name.to_string())),
            },
        };
        Ok(verb)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Custom(method) => write!(f, "custom:{method}"),
            other => f.write_str(other.dispatch(false).method.as_str()),
        }
    }
}

/// RFC 9110 token: one or more tchar.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
