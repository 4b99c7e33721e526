//! Picks the content type for a response and decodes its body.
//!
//! The effective type is the observed one (sniffed from the response's
//! `Content-Type`, only when sniffing is on) and otherwise the configured
//! request type. A response without a `Content-Type` header therefore falls
//! back to the configured type even when sniffing is on.

use tracing::debug;

use crate::codec::{CodecRegistry, ContentType};
use crate::error::RestError;
use crate::http::HttpResponse;
use crate::types::Decoded;

/// Content type observed on `response`, if sniffing is enabled and the
/// header is present.
pub fn observe(response: &HttpResponse, sniff: bool) -> Option<ContentType> {
    if !sniff {
        return None;
    }
    let observed = response.header("content-type").and_then(ContentType::from_header);
    debug!(
        content_type = ?observed.as_ref().map(ContentType::as_str),
        "sniffed response content type"
    );
    observed
}

/// Type used for decoding: observed if set, else configured.
pub fn effective<'a>(
    observed: Option<&'a ContentType>,
    configured: &'a ContentType,
) -> &'a ContentType {
    observed.unwrap_or(configured)
}

/// Decode `body` with the codec for `content_type` and shape the result.
///
/// `as_object` only changes the returned view, never the codec.
pub fn decode(
    codecs: &CodecRegistry,
    content_type: &ContentType,
    body: &[u8],
    as_object: bool,
) -> Result<Decoded, RestError> {
    let value = codecs.decode(content_type, body)?;
    Ok(Decoded::new(value, as_object))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(content_type: Option<&str>, body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: content_type
                .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
                .unwrap_or_default(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn sniffing_disabled_observes_nothing() {
        let resp = response(Some("application/xml"), "");
        assert_eq!(observe(&resp, false), None);
    }

    #[test]
    fn sniffing_takes_first_segment() {
        let resp = response(Some("application/json; charset=utf-8"), "");
        assert_eq!(observe(&resp, true), Some(ContentType::JSON));
    }

    #[test]
    fn missing_header_falls_back_to_configured() {
        let resp = response(None, "");
        let observed = observe(&resp, true);
        assert_eq!(observed, None);
        assert_eq!(effective(observed.as_ref(), &ContentType::XML), &ContentType::XML);
    }

    #[test]
    fn observed_type_wins_over_configured() {
        let observed = ContentType::JSON;
        assert_eq!(effective(Some(&observed), &ContentType::XML), &ContentType::JSON);
    }

    #[test]
    fn as_object_selects_view_not_codec() {
        let codecs = CodecRegistry::new();
        let body = br#"{"id": 1}"#;
        let mapping = decode(&codecs, &ContentType::JSON, body, false).unwrap();
        let object = decode(&codecs, &ContentType::JSON, body, true).unwrap();
        assert_eq!(mapping, Decoded::Mapping(json!({"id": 1})));
        assert_eq!(object.into_value(), json!({"id": 1}));
    }

    #[test]
    fn unsupported_effective_type_is_an_error() {
        let codecs = CodecRegistry::new();
        let err = decode(&codecs, &ContentType::new("text/html"), b"<p>", false).unwrap_err();
        assert!(matches!(err, RestError::UnsupportedContentType(t) if t == "text/html"));
    }
}
