//! Request dispatch for the Beaker service.
//!
//! # Design
//! `Client` is a cheap, cloneable handle over one frozen `ClientConfig`, one
//! `Transport` and one `Backoff`. Each call moves through the same stages:
//! `RequestBuilder` addresses and authenticates the `ApiRequest`,
//! `RetryingTransport` sends it, and `response::check`/`response::parse`
//! turn the final response into a typed value or an error. The client holds
//! no mutable state, so concurrent calls from many threads need no locking
//! beyond what the backoff random source does internally.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::backoff::Backoff;
use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::request::{ApiRequest, RequestBuilder};
use crate::response;
use crate::retry::RetryingTransport;
use crate::transport::{Transport, UreqTransport};

/// Account details of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Client for the Beaker API, bound to one address and one token.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: RetryingTransport,
}

impl Client {
    /// Create a client for `address` authenticating with `token`. An empty
    /// token makes anonymous requests.
    pub fn new(address: &str, token: &str) -> Result<Self> {
        Ok(Self::from_config(ClientConfig::new(address)?.with_token(token)))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(UreqTransport::new()), Backoff::global())
    }

    /// Build a client over a custom transport and backoff source.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        backoff: Arc<Backoff>,
    ) -> Self {
        let transport = RetryingTransport::new(transport, backoff, &config);
        Self {
            inner: Arc::new(Inner { config, transport }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Base address the client talks to.
    pub fn address(&self) -> &str {
        self.inner.config.base_url.as_str()
    }

    /// The request `api` would send, fully addressed and decorated.
    pub fn build_request(&self, api: &ApiRequest) -> Result<HttpRequest> {
        RequestBuilder::new(&self.inner.config).build(api)
    }

    /// Send `api` with retries and return the raw final response, whatever
    /// its status.
    pub fn send(&self, ctx: &Context, api: &ApiRequest) -> Result<HttpResponse> {
        let request = self.build_request(api)?;
        self.inner.transport.send(ctx, &request)
    }

    /// Send `api` and fail on any error status.
    pub fn execute(&self, ctx: &Context, api: &ApiRequest) -> Result<HttpResponse> {
        response::check(self.send(ctx, api)?)
    }

    /// Send `api` and decode a successful body as `T`.
    pub fn call<T: DeserializeOwned>(&self, ctx: &Context, api: &ApiRequest) -> Result<T> {
        response::parse(self.send(ctx, api)?)
    }

    /// Issue a new session token. Works without a configured token.
    pub fn generate_token(&self, ctx: &Context) -> Result<String> {
        let response = self.execute(ctx, &ApiRequest::post(["auth", "tokens"]))?;
        response::session_token(&response)
    }

    /// The user the client's token belongs to.
    pub fn whoami(&self, ctx: &Context) -> Result<User> {
        self.call(ctx, &ApiRequest::get(["user"]))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
