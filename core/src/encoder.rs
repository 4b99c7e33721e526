//! Puts the parameter set onto the outgoing request.
//!
//! Query mode appends a form-encoded query string to the URL; body mode runs
//! the configured codec and attaches the payload. An empty or absent
//! parameter set leaves the request untouched in both modes.

use serde_json::Value;
use url::form_urlencoded;

use crate::codec::{CodecRegistry, ContentType};
use crate::error::RestError;
use crate::http::HttpRequest;
use crate::types::Params;
use crate::verb::EncodeMode;

/// Encode `params` into `request` according to `mode`.
pub fn apply(
    request: &mut HttpRequest,
    mode: EncodeMode,
    params: Option<&Params>,
    content_type: &ContentType,
    codecs: &CodecRegistry,
) -> Result<(), RestError> {
    let Some(params) = params.filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    match mode {
        EncodeMode::Query => {
            request.url = append_query(&request.url, params);
        }
        EncodeMode::Body => {
            request.body = Some(codecs.encode(content_type, params)?);
            request.field_count = params.len();
        }
    }
    Ok(())
}

/// Append `params` as a query string, keeping insertion order.
///
/// Uses `&` when the URL already carries a query.
pub fn append_query(url: &str, params: &Params) -> String {
    let query = build_query(params);
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// Form-encode a parameter set.
///
/// Nested objects become `key[sub]`, arrays `key[0]`, booleans `1`/`0`;
/// nulls are skipped.
pub fn build_query(params: &Params) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        append_pairs(&mut serializer, key, value);
    }
    serializer.finish()
}

fn append_pairs(
    serializer: &mut form_urlencoded::Serializer<'_, String>,
    key: &str,
    value: &Value,
) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            serializer.append_pair(key, if *b { "1" } else { "0" });
        }
        Value::Number(n) => {
            serializer.append_pair(key, &n.to_string());
        }
        Value::String(s) => {
            serializer.append_pair(key, s);
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                append_pairs(serializer, &format!("{key}[{i}]"), item);
            }
        }
        Value::Object(fields) => {
            for (sub, item) in fields {
                append_pairs(serializer, &format!("{key}[{sub}]"), item);
            }
        }
    }
}
