//! Client facade: configuration, request building, execution, decoding.
//!
//! # Design
//! `RestClient` owns its configuration, codec registry, cookie jar, and
//! transport. `configure` validates the verb and URL and stores an immutable
//! `RequestSpec`; `execute` takes that spec (it is consumed, so each call
//! needs its own `configure`) and runs dispatch, parameter encoding,
//! auth/cookie decoration, the transport round-trip, and decoding, in that
//! order.
//!
//! `execute` borrows the client mutably, so one instance can never have two
//! calls in flight and its configuration cannot change mid-call. Share
//! instances across threads only behind your own synchronization.
//!
//! The cookie jar's temp file is created by the constructor and removed when
//! the client is dropped, on success and error paths alike. `close` removes
//! it eagerly and reports any I/O error.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::codec::{CodecRegistry, ContentType};
use crate::config::ClientConfig;
use crate::cookie::CookieJar;
use crate::decode;
use crate::encoder;
use crate::error::RestError;
use crate::http::{Credentials, HttpRequest, HttpResponse};
use crate::session;
use crate::transport::{Transport, UreqTransport};
use crate::types::{Decoded, Params, RequestSpec};
use crate::verb::Verb;

/// Blocking REST client for one call at a time.
#[derive(Debug)]
pub struct RestClient<T: Transport = UreqTransport> {
    config: ClientConfig,
    codecs: CodecRegistry,
    jar: CookieJar,
    transport: T,
    spec: Option<RequestSpec>,
    observed: Option<ContentType>,
    last_status: Option<u16>,
}

impl RestClient<UreqTransport> {
    /// Client with default configuration over a default `ureq` agent.
    pub fn new() -> Result<Self, RestError> {
        Self::with_transport(UreqTransport::new())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, RestError> {
        Self::from_parts(config, UreqTransport::new())
    }
}

impl<T: Transport> RestClient<T> {
    pub fn with_transport(transport: T) -> Result<Self, RestError> {
        Self::from_parts(ClientConfig::default(), transport)
    }

    pub fn from_parts(config: ClientConfig, transport: T) -> Result<Self, RestError> {
        Ok(Self {
            config,
            codecs: CodecRegistry::new(),
            jar: CookieJar::new()?,
            transport,
            spec: None,
            observed: None,
            last_status: None,
        })
    }

    // -- fluent configuration ---------------------------------------------

    pub fn content_type(&mut self, content_type: impl Into<ContentType>) -> &mut Self {
        self.config.content_type = content_type.into();
        self
    }

    pub fn user_agent(&mut self, user_agent: &str) -> &mut Self {
        self.config.user_agent = user_agent.to_string();
        self
    }

    /// Enable basic auth with these credentials.
    pub fn http_auth(&mut self, username: &str, password: &str) -> &mut Self {
        self.config.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Decode with the response's `Content-Type` when it reports one.
    pub fn use_response_content_type(&mut self, enabled: bool) -> &mut Self {
        self.config.use_response_content_type = enabled;
        self
    }

    /// Send a custom verb's parameters in the body instead of the query.
    pub fn use_post(&mut self, enabled: bool) -> &mut Self {
        self.config.use_post_for_custom = enabled;
        self
    }

    pub fn fail_on_status(&mut self, enabled: bool) -> &mut Self {
        self.config.fail_on_status = enabled;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register extra codecs before executing.
    pub fn codecs_mut(&mut self) -> &mut CodecRegistry {
        &mut self.codecs
    }

    pub fn cookie_jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Describe the next call. `verb` is a name such as `"get"` or
    /// `"custom:PURGE"`.
    pub fn configure(
        &mut self,
        verb: &str,
        url: &str,
        params: Option<Params>,
    ) -> Result<&mut Self, RestError> {
        let verb: Verb = verb.parse()?;
        self.configure_verb(verb, url, params)
    }

    pub fn configure_verb(
        &mut self,
        verb: Verb,
        url: &str,
        params: Option<Params>,
    ) -> Result<&mut Self, RestError> {
        session::parse_url(url)?;
        debug!(%verb, url, "request configured");
        self.spec = Some(RequestSpec {
            verb,
            url: url.to_string(),
            params,
        });
        Ok(self)
    }

    pub fn request_spec(&self) -> Option<&RequestSpec> {
        self.spec.as_ref()
    }

    // -- execution ------------------------------------------------------------

    /// Build the wire request for the configured call without sending it.
    pub fn build_request(&self) -> Result<HttpRequest, RestError> {
        let spec = self.spec.as_ref().ok_or(RestError::NotConfigured)?;
        self.prepare(spec)
    }

    /// Run the configured call and decode the response.
    ///
    /// `as_object` selects the `Decoded::Object` view instead of the raw
    /// mapping; it does not affect which codec runs.
    pub fn execute(&mut self, as_object: bool) -> Result<Decoded, RestError> {
        let spec = self.spec.take().ok_or(RestError::NotConfigured)?;
        self.observed = None;
        self.last_status = None;

        let request = self.prepare(&spec)?;
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.send(&request)?;
        session::absorb(&request.url, &response, &mut self.jar)?;
        self.parse_response(response, as_object)
    }

    /// Execute and deserialize the body into `D`.
    pub fn execute_into<D: DeserializeOwned>(&mut self) -> Result<D, RestError> {
        let value = self.execute(false)?.into_value();
        serde_json::from_value(value).map_err(|e| RestError::Decode(e.to_string()))
    }

    /// Decode a response obtained for the configured call.
    pub fn parse_response(
        &mut self,
        response: HttpResponse,
        as_object: bool,
    ) -> Result<Decoded, RestError> {
        self.last_status = Some(response.status);
        self.observed = decode::observe(&response, self.config.use_response_content_type);

        if self.config.fail_on_status && !response.is_success() {
            return Err(RestError::HttpStatus {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        let content_type = decode::effective(self.observed.as_ref(), &self.config.content_type);
        debug!(%content_type, status = response.status, "decoding response");
        decode::decode(&self.codecs, content_type, &response.body, as_object)
    }

    /// Content type sniffed from the last response, if sniffing was on and
    /// the server sent one.
    pub fn observed_content_type(&self) -> Option<&ContentType> {
        self.observed.as_ref()
    }

    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    /// Release the cookie store now rather than at drop.
    pub fn close(self) -> Result<(), RestError> {
        self.jar.close()
    }

    fn prepare(&self, spec: &RequestSpec) -> Result<HttpRequest, RestError> {
        let dispatch = spec.verb.dispatch(self.config.use_post_for_custom);
        let content_type = &self.config.content_type;

        let mut request = HttpRequest::new(dispatch.method, &spec.url);
        request
            .headers
            .push(("user-agent".to_string(), self.config.user_agent.clone()));
        request
            .headers
            .push(("accept".to_string(), content_type.to_string()));

        encoder::apply(
            &mut request,
            dispatch.mode,
            spec.params.as_ref(),
            content_type,
            &self.codecs,
        )?;
        if request.body.is_some() {
            request
                .headers
                .push(("content-type".to_string(), content_type.to_string()));
        }

        session::decorate(&mut request, self.config.credentials.as_ref(), &self.jar)?;
        Ok(request)
    }
}
