//! Executing one HTTP round-trip.
//!
//! # Design
//! `Transport` is the seam between the core and the network: it takes a
//! plain-data `HttpRequest`, performs exactly one logical attempt and returns
//! the response with its body fully read. Retrying is layered on top by
//! `RetryingTransport`, and tests substitute scripted transports.
//!
//! `UreqTransport` follows redirects itself rather than letting ureq do it.
//! Every header of the original request, `Authorization` included, is copied
//! onto each hop: the service redirects between its own endpoints and those
//! endpoints require the caller's credentials.

use std::time::{Duration, Instant};

use ureq::Agent;
use url::Url;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Hops followed before giving up on a redirect chain.
pub const MAX_REDIRECTS: usize = 10;

/// Performs one HTTP attempt.
pub trait Transport: Send + Sync {
    /// Send `request`, reading the whole response body before returning.
    /// `timeout` bounds this attempt alone, redirects included.
    fn execute(&self, request: &HttpRequest, timeout: Duration)
        -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a pooled `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .build()
            .new_agent();
        Self { agent }
    }

    fn send_once(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let mut response = match (request.method, &request.body) {
            (HttpMethod::Get, _) => self.with_headers(self.agent.get(url), request, timeout).call(),
            (HttpMethod::Delete, _) => {
                self.with_headers(self.agent.delete(url), request, timeout).call()
            }
            (method, body) => {
                let builder = match method {
                    HttpMethod::Post => self.agent.post(url),
                    HttpMethod::Put => self.agent.put(url),
                    _ => self.agent.patch(url),
                };
                let builder = self.with_headers(builder, request, timeout);
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        }
        .map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string().map_err(classify)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn with_headers<B>(
        &self,
        mut builder: ureq::RequestBuilder<B>,
        request: &HttpRequest,
        timeout: Duration,
    ) -> ureq::RequestBuilder<B> {
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.config().timeout_global(Some(timeout)).build()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        follow_redirects(request, timeout, |hop, left| self.send_once(hop, left))
    }
}

/// Drive `send` through a redirect chain of at most `MAX_REDIRECTS` hops.
///
/// `timeout` covers the whole chain: each hop gets only what earlier hops
/// left over, and no hop starts once the budget is gone.
pub fn follow_redirects<F>(
    request: &HttpRequest,
    timeout: Duration,
    mut send: F,
) -> Result<HttpResponse, TransportError>
where
    F: FnMut(&HttpRequest, Duration) -> Result<HttpResponse, TransportError>,
{
    let deadline = Instant::now() + timeout;
    let mut current = request.clone();
    for _ in 0..=MAX_REDIRECTS {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(TransportError::Network(format!(
                "timed out after {timeout:?} following redirects from {}",
                request.url
            )));
        }
        let response = send(&current, left)?;
        match redirect_target(request, &current, &response)? {
            Some(next) => {
                tracing::debug!(status = response.status, from = %current.url, to = %next.url, "following redirect");
                current = next;
            }
            None => return Ok(response),
        }
    }
    Err(TransportError::Request(format!(
        "stopped after {MAX_REDIRECTS} redirects from {}",
        request.url
    )))
}

/// Next request in a redirect chain, or `None` if `response` is final.
///
/// Headers always come from `original`, the request the caller built.
pub fn redirect_target(
    original: &HttpRequest,
    current: &HttpRequest,
    response: &HttpResponse,
) -> Result<Option<HttpRequest>, TransportError> {
    if !matches!(response.status, 301 | 302 | 303 | 307 | 308) {
        return Ok(None);
    }
    let Some(location) = response.header("location") else {
        return Ok(None);
    };

    let base = Url::parse(&current.url)
        .map_err(|e| TransportError::Request(format!("invalid url {}: {e}", current.url)))?;
    let target = base
        .join(location)
        .map_err(|e| TransportError::Request(format!("invalid redirect to {location:?}: {e}")))?;

    let keeps_method = matches!(response.status, 307 | 308)
        || (current.method == HttpMethod::Get && response.status != 303);
    let (method, body) = if keeps_method {
        (current.method, current.body.clone())
    } else {
        (HttpMethod::Get, None)
    };
    let headers = original
        .headers
        .iter()
        .filter(|(name, _)| body.is_some() || !name.eq_ignore_ascii_case("content-type"))
        .cloned()
        .collect();

    Ok(Some(HttpRequest {
        method,
        url: target.into(),
        headers,
        body,
    }))
}

/// Network-level failures are retryable: IO, timeouts, DNS, refused
/// connections and protocol errors, which include a connection dropped in
/// the middle of a response. Anything about the request itself is not.
fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Io(_)
        | ureq::Error::Timeout(_)
        | ureq::Error::HostNotFound
        | ureq::Error::ConnectionFailed
        | ureq::Error::Protocol(_) => TransportError::Network(err.to_string()),
        other => TransportError::Request(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(method: HttpMethod, body: Option<&str>) -> HttpRequest {
        let mut headers = vec![
            ("User-Agent".to_string(), "beaker-test".to_string()),
            ("Authorization".to_string(), "Bearer tok".to_string()),
        ];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url: "http://localhost:3000/api/v3/faults/redirect".to_string(),
            headers,
            body: body.map(str::to_string),
        }
    }

    fn redirect(status: u16, location: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("Location".to_string(), location.to_string())],
            body: String::new(),
        }
    }

    #[test]
    fn redirect_keeps_authorization() {
        let original = request(HttpMethod::Get, None);
        let next = redirect_target(&original, &original, &redirect(307, "/api/v3/user"))
            .unwrap()
            .unwrap();
        assert_eq!(next.url, "http://localhost:3000/api/v3/user");
        assert_eq!(next.header("authorization"), Some("Bearer tok"));
        assert_eq!(next.method, HttpMethod::Get);
    }

    #[test]
    fn see_other_switches_to_get_and_drops_body() {
        let original = request(HttpMethod::Post, Some("{}"));
        let next = redirect_target(&original, &original, &redirect(303, "/api/v3/done"))
            .unwrap()
            .unwrap();
        assert_eq!(next.method, HttpMethod::Get);
        assert!(next.body.is_none());
        assert_eq!(next.header("content-type"), None);
        assert_eq!(next.header("authorization"), Some("Bearer tok"));
    }

    #[test]
    fn temporary_redirect_preserves_method_and_body() {
        let original = request(HttpMethod::Patch, Some(r#"{"name":"x"}"#));
        let next = redirect_target(
            &original,
            &original,
            &redirect(308, "https://other.example.org/api/v3/x"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(next.method, HttpMethod::Patch);
        assert_eq!(next.body.as_deref(), Some(r#"{"name":"x"}"#));
        assert_eq!(next.url, "https://other.example.org/api/v3/x");
        assert_eq!(next.headers, original.headers);
    }

    #[test]
    fn non_redirect_is_final() {
        let original = request(HttpMethod::Get, None);
        let ok = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "{}".to_string(),
        };
        assert_eq!(redirect_target(&original, &original, &ok).unwrap(), None);
        let no_location = HttpResponse {
            status: 302,
            headers: Vec::new(),
            body: String::new(),
        };
        assert_eq!(redirect_target(&original, &original, &no_location).unwrap(), None);
    }

    #[test]
    fn moved_post_becomes_get_without_body() {
        for status in [301, 302] {
            let original = request(HttpMethod::Post, Some(r#"{"name":"x"}"#));
            let next = redirect_target(&original, &original, &redirect(status, "/api/v3/moved"))
                .unwrap()
                .unwrap();
            assert_eq!(next.method, HttpMethod::Get, "{status}");
            assert!(next.body.is_none(), "{status}");
            assert_eq!(next.header("content-type"), None, "{status}");
            assert_eq!(next.header("authorization"), Some("Bearer tok"), "{status}");
            assert_eq!(next.url, "http://localhost:3000/api/v3/moved");
        }
    }

    #[test]
    fn moved_patch_becomes_get() {
        let original = request(HttpMethod::Patch, Some("{}"));
        let next = redirect_target(&original, &original, &redirect(301, "/api/v3/x"))
            .unwrap()
            .unwrap();
        assert_eq!(next.method, HttpMethod::Get);
        assert!(next.body.is_none());
    }

    #[test]
    fn moved_get_stays_get() {
        let original = request(HttpMethod::Get, None);
        let next = redirect_target(&original, &original, &redirect(302, "/api/v3/x"))
            .unwrap()
            .unwrap();
        assert_eq!(next.method, HttpMethod::Get);
    }

    #[test]
    fn redirect_loop_stops_after_cap() {
        let original = request(HttpMethod::Get, None);
        let mut sends = 0;
        let err = follow_redirects(&original, Duration::from_secs(5), |hop, _| {
            sends += 1;
            Ok(redirect(307, &hop.url))
        })
        .unwrap_err();
        assert_eq!(sends, MAX_REDIRECTS + 1);
        assert!(matches!(&err, TransportError::Request(msg) if msg.contains("stopped after 10 redirects")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn chain_within_cap_returns_final_response() {
        let original = request(HttpMethod::Get, None);
        let mut sends = 0;
        let response = follow_redirects(&original, Duration::from_secs(5), |_, _| {
            sends += 1;
            if sends <= MAX_REDIRECTS {
                Ok(redirect(302, "/api/v3/next"))
            } else {
                Ok(HttpResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: "{}".to_string(),
                })
            }
        })
        .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(sends, MAX_REDIRECTS + 1);
    }

    #[test]
    fn timeout_spans_the_whole_chain() {
        let original = request(HttpMethod::Get, None);
        let timeout = Duration::from_millis(200);
        let mut budgets = Vec::new();
        let err = follow_redirects(&original, timeout, |_, left| {
            budgets.push(left);
            std::thread::sleep(Duration::from_millis(80));
            Ok(redirect(307, "/api/v3/slow"))
        })
        .unwrap_err();

        assert!(err.is_retryable(), "{err:?}");
        assert!(budgets.len() <= 3, "{budgets:?}");
        assert!(budgets.windows(2).all(|pair| pair[1] < pair[0]), "{budgets:?}");
        assert!(budgets.iter().all(|left| *left <= timeout));
    }

    #[test]
    fn classify_separates_network_from_request_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(classify(ureq::Error::Io(io)).is_retryable());
        assert!(classify(ureq::Error::HostNotFound).is_retryable());
        assert!(classify(ureq::Error::ConnectionFailed).is_retryable());
        assert!(!classify(ureq::Error::BadUri("::".into())).is_retryable());
        assert!(!classify(ureq::Error::TooManyRedirects).is_retryable());
    }
}
