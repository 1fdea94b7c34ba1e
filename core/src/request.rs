//! Turning a logical API call into an addressed, authenticated request.
//!
//! # Design
//! An `ApiRequest` names a call in service terms: method, path segments under
//! the API prefix, query pairs, an optional JSON body and an optional author
//! override. `RequestBuilder` combines it with the client configuration into
//! an `HttpRequest`. The retry loop derives the request from the same inputs
//! once per call, so nothing here is stateful.

use serde::Serialize;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http::{HttpMethod, HttpRequest};

/// Path prefix every API call is rooted under.
pub const API_PREFIX: [&str; 2] = ["api", "v3"];

/// Header carrying the client's version for compatibility checks.
pub const HEADER_VERSION: &str = "Beaker-Version";

/// Header attributing a created resource to another account. Its value is
/// that account's token.
pub const HEADER_AUTHOR: &str = "Beaker-Author";

/// A call against the service, before addressing and authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    method: HttpMethod,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<String>,
    author: Option<String>,
}

impl ApiRequest {
    /// A request for `segments`, each escaped and joined under `/api/v3`.
    pub fn new<I, S>(method: HttpMethod, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
            author: None,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Get, segments)
    }

    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Post, segments)
    }

    pub fn patch<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Patch, segments)
    }

    pub fn delete<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Delete, segments)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON-encoded body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_string(body).map_err(ClientError::Encode)?);
        Ok(self)
    }

    /// Create resources on behalf of the account owning `token`.
    #[must_use]
    pub fn author(mut self, token: impl Into<String>) -> Self {
        self.author = Some(token.into());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Addresses and decorates `ApiRequest`s for one client configuration.
#[derive(Debug, Clone)]
pub struct RequestBuilder<'a> {
    config: &'a ClientConfig,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a ClientConfig) -> Self {
        Self { config }
    }

    /// Absolute URL for `request` against the configured base address.
    pub fn url(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Config(format!("{} cannot hold a path", self.config.base_url))
            })?
            .clear()
            .extend(API_PREFIX)
            .extend(&request.segments);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    pub fn build(&self, request: &ApiRequest) -> Result<HttpRequest> {
        let mut headers = Vec::with_capacity(5);
        headers.push(("User-Agent".to_string(), self.config.user_agent.clone()));
        if let Some(token) = &self.config.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        if let Some(version) = &self.config.version {
            headers.push((HEADER_VERSION.to_string(), version.clone()));
        }
        if let Some(author) = &request.author {
            headers.push((HEADER_AUTHOR.to_string(), author.clone()));
        }
        if request.body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method: request.method,
            url: self.url(request)?.into(),
            headers,
            body: request.body.clone(),
        })
    }
}
