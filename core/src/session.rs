//! Credentials and cookie state layered onto a call.
//!
//! Basic auth is attached only when credentials are configured. The cookie
//! jar is always consulted before the call and always fed the response's
//! `Set-Cookie` headers afterwards.

use tracing::debug;
use url::Url;

use crate::cookie::CookieJar;
use crate::error::RestError;
use crate::http::{Credentials, HttpRequest, HttpResponse};

/// Attach credentials and any matching cookies to `request`.
pub fn decorate(
    request: &mut HttpRequest,
    credentials: Option<&Credentials>,
    jar: &CookieJar,
) -> Result<(), RestError> {
    if let Some(credentials) = credentials {
        request.auth = Some(credentials.clone());
        request
            .headers
            .push(("authorization".to_string(), credentials.header_value()));
    }
    let url = parse_url(&request.url)?;
    if let Some(cookies) = jar.cookie_header(&url)? {
        debug!("sending stored cookies");
        request.headers.push(("cookie".to_string(), cookies));
    }
    Ok(())
}

/// Store every `Set-Cookie` header of `response` in the jar.
pub fn absorb(
    request_url: &str,
    response: &HttpResponse,
    jar: &mut CookieJar,
) -> Result<(), RestError> {
    let url = parse_url(request_url)?;
    for header in response.header_values("set-cookie") {
        jar.store(&url, header)?;
    }
    Ok(())
}

pub(crate) fn parse_url(url: &str) -> Result<Url, RestError> {
    Url::parse(url).map_err(|e| RestError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
