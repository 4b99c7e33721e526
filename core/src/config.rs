//! Per-client configuration.
//!
//! `ClientConfig` is plain data and deserializes with defaults for any
//! missing field, so it can be loaded from a JSON document and handed to
//! `RestClient::with_config`.

use serde::{Deserialize, Serialize};

use crate::codec::ContentType;
use crate::http::Credentials;

pub const DEFAULT_USER_AGENT: &str = concat!("rest-core/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Encodes request bodies and fills `Content-Type`/`Accept`.
    pub content_type: ContentType,
    pub user_agent: String,
    /// Basic auth is used when set.
    pub credentials: Option<Credentials>,
    /// Decode with the response's own `Content-Type` when it reports one.
    pub use_response_content_type: bool,
    /// Send parameters of a custom verb in the body instead of the query.
    pub use_post_for_custom: bool,
    /// Turn non-2xx responses into `RestError::HttpStatus`.
    pub fail_on_status: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            content_type: ContentType::JSON,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            credentials: None,
            use_response_content_type: false,
            use_post_for_custom: false,
            fail_on_status: false,
        }
    }
}
