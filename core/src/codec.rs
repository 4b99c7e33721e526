//! Content-type tags and the codecs registered for them.
//!
//! # Design
//! A `ContentType` is the tag written into `Content-Type`/`Accept` headers
//! and also the key used to find a codec. The registry ships JSON and XML;
//! callers can register more. Resolving an unknown tag is an error, never a
//! fallback to some default codec.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RestError;
use crate::types::Params;
use crate::xml::XmlCodec;

/// Media type tag, stored lowercase without parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    pub const JSON: ContentType = ContentType(Cow::Borrowed("application/json"));
    pub const XML: ContentType = ContentType(Cow::Borrowed("application/xml"));

    pub fn new(tag: &str) -> Self {
        ContentType(Cow::Owned(tag.trim().to_ascii_lowercase()))
    }

    /// Tag from a `Content-Type` header value: the segment before the first `;`.
    ///
    /// Returns `None` for an empty header.
    pub fn from_header(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        if essence.is_empty() {
            None
        } else {
            Some(ContentType::new(essence))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::JSON
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentType {
    fn from(tag: String) -> Self {
        ContentType::new(&tag)
    }
}

impl From<&str> for ContentType {
    fn from(tag: &str) -> Self {
        ContentType::new(tag)
    }
}

impl From<ContentType> for String {
    fn from(tag: ContentType) -> Self {
        tag.0.into_owned()
    }
}

/// Encode/decode pair for one content type.
pub trait Codec: Send + Sync {
    fn encode(&self, params: &Params) -> Result<Vec<u8>, RestError>;

    fn decode(&self, body: &[u8]) -> Result<Value, RestError>;
}

/// Plain `serde_json` serialization of the parameter map.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, params: &Params) -> Result<Vec<u8>, RestError> {
        serde_json::to_vec(params).map_err(|e| RestError::Encode(e.to_string()))
    }

    fn decode(&self, body: &[u8]) -> Result<Value, RestError> {
        serde_json::from_slice(body).map_err(|e| RestError::Decode(e.to_string()))
    }
}

/// Codecs keyed by content-type tag.
pub struct CodecRegistry {
    codecs: HashMap<ContentType, Box<dyn Codec>>,
}

impl CodecRegistry {
    /// Registry holding only the built-in JSON and XML codecs.
    pub fn new() -> Self {
        let mut registry = Self {
            codecs: HashMap::new(),
        };
        registry.register(ContentType::JSON, JsonCodec);
        registry.register(ContentType::XML, XmlCodec);
        registry
    }

    /// Add or replace the codec for `tag`.
    pub fn register(&mut self, tag: impl Into<ContentType>, codec: impl Codec + 'static) {
        self.codecs.insert(tag.into(), Box::new(codec));
    }

    pub fn resolve(&self, tag: &ContentType) -> Result<&dyn Codec, RestError> {
        self.codecs
            .get(tag)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| RestError::UnsupportedContentType(tag.to_string()))
    }

    /// Encode `params` with the codec for `tag`.
    pub fn encode(&self, tag: &ContentType, params: &Params) -> Result<Vec<u8>, RestError> {
        self.resolve(tag)?.encode(params)
    }

    /// Decode `body` with the codec for `tag`.
    ///
    /// An empty or whitespace-only body decodes to `null` for every codec.
    pub fn decode(&self, tag: &ContentType, body: &[u8]) -> Result<Value, RestError> {
        let codec = self.resolve(tag)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        codec.decode(body)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.codecs.keys().map(ContentType::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("CodecRegistry").field("tags", &tags).finish()
    }
}
