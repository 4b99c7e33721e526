//! Blocking REST client with pluggable content negotiation.
//!
//! # Overview
//! A caller describes one call (verb, URL, optional parameter set), tunes
//! the content type, user agent, basic auth and sniffing through fluent
//! setters, and then executes it. The response body is decoded into a
//! generic value or an object-like `Record`.
//!
//! ```no_run
//! use rest_core::{ContentType, RestClient};
//!
//! # fn main() -> Result<(), rest_core::RestError> {
//! let mut client = RestClient::new()?;
//! client
//!     .content_type(ContentType::JSON)
//!     .user_agent("Yah")
//!     .http_auth("aloha", "123123123")
//!     .configure("get", "http://myapi.test/api", None)?;
//! let result = client.execute(false)?;
//! # drop(result);
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - `verb` maps each abstract verb to a wire method and an encoder mode.
//! - `encoder` writes parameters into the query string or, through the
//!   `codec` registry, into the body.
//! - `session` attaches basic auth and the instance's `cookie` jar.
//! - `transport` is the only place that touches the network.
//! - `decode` picks the effective content type and decodes the body.
//! - `client` owns the state and runs those steps in order.

pub mod client;
pub mod codec;
pub mod config;
pub mod cookie;
pub mod decode;
pub mod encoder;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;
pub mod types;
pub mod verb;
pub mod xml;

pub use client::RestClient;
pub use codec::{Codec, CodecRegistry, ContentType, JsonCodec};
pub use config::ClientConfig;
pub use cookie::CookieJar;
pub use error::RestError;
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{Decoded, Params, Record, RequestSpec};
pub use verb::{Dispatch, EncodeMode, Verb};
pub use xml::XmlCodec;
