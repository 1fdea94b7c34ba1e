//! Classifying completed responses.
//!
//! Runs once per logical request, after retrying is over. Statuses below 400
//! are success. For anything else the body is decoded as an `ApiError`; a body
//! that does not decode is reported verbatim rather than dropped.

use serde::de::DeserializeOwned;

use crate::error::{ApiError, ClientError, Result};
use crate::http::HttpResponse;

/// Name of the cookie the token endpoint uses to return a session token.
pub const TOKEN_COOKIE: &str = "User-Token";

/// Map an error status to its structured error. Success passes through.
pub fn check(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    match serde_json::from_str::<ApiError>(&response.body) {
        Ok(error) => Err(ClientError::Api {
            status: response.status,
            error,
        }),
        Err(_) => Err(ClientError::UnparseableError {
            status: response.status,
            body: response.body,
        }),
    }
}

/// Check the status, then decode the body as `T`.
pub fn parse<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    let response = check(response)?;
    decode(&response.body)
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| ClientError::Decode {
        body: body.to_string(),
        source,
    })
}

/// Session token set by the token endpoint through the `User-Token` cookie.
///
/// The last matching cookie wins; an empty value counts as absent.
pub fn session_token(response: &HttpResponse) -> Result<String> {
    response
        .header_values("set-cookie")
        .filter_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name.trim() == TOKEN_COOKIE).then(|| value.trim().trim_matches('"').to_string())
        })
        .last()
        .filter(|token| !token.is_empty())
        .ok_or(ClientError::TokenNotFound)
}
