//! Verify request building and response classification against JSON test
//! vectors stored in `test-vectors/`.
//!
//! Request bodies are compared as parsed JSON, not raw strings, so field
//! ordering never causes false negatives.

use beaker_core::{
    response, ApiError, ApiRequest, ClientConfig, ClientError, HttpMethod, HttpResponse,
    RequestBuilder,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

const BASE_URL: &str = "https://beaker.example.org";

fn load(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|pair| {
                    let pair = pair.as_array().unwrap();
                    (
                        pair[0].as_str().unwrap().to_string(),
                        pair[1].as_str().unwrap().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let vectors = load(include_str!("../../test-vectors/requests.json"));

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut config = ClientConfig::new(BASE_URL)
            .unwrap()
            .with_user_agent("beaker-test")
            .with_version("1.2.3");
        if let Some(token) = case["token"].as_str() {
            config = config.with_token(token);
        }

        let input = &case["input"];
        let segments: Vec<String> = input["segments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap().to_string())
            .collect();
        let mut request = ApiRequest::new(parse_method(input["method"].as_str().unwrap()), segments);
        for (key, value) in pairs(&input["query"]) {
            request = request.query(key, value);
        }
        if !input["body"].is_null() {
            request = request.json(&input["body"]).unwrap();
        }
        if let Some(author) = input["author"].as_str() {
            request = request.author(author);
        }

        let built = RequestBuilder::new(&config).build(&request).unwrap();
        let expected = &case["expected_request"];

        assert_eq!(
            built.method,
            parse_method(expected["method"].as_str().unwrap()),
            "{name}: method"
        );
        assert_eq!(built.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(built.headers, pairs(&expected["headers"]), "{name}: headers");

        let body = built
            .body
            .as_deref()
            .map(|body| serde_json::from_str::<Value>(body).unwrap())
            .unwrap_or(Value::Null);
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let vectors = load(include_str!("../../test-vectors/responses.json"));

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let body = case["body"].as_str().unwrap().to_string();
        let expected = &case["expected"];

        let result = response::check(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.clone(),
        });

        match (expected["kind"].as_str().unwrap(), result) {
            ("ok", Ok(response)) => assert_eq!(response.body, body, "{name}: body"),
            ("api", Err(ClientError::Api { status: got, error })) => {
                assert_eq!(got, status, "{name}: status");
                assert_eq!(
                    error,
                    ApiError {
                        code: expected["code"].as_u64().unwrap() as u16,
                        message: expected["message"].as_str().unwrap().to_string(),
                    },
                    "{name}"
                );
            }
            ("unparseable", Err(ClientError::UnparseableError { status: got, body: raw })) => {
                assert_eq!(got, status, "{name}: status");
                assert_eq!(raw, body, "{name}: raw body");
            }
            (kind, other) => panic!("{name}: expected {kind}, got {other:?}"),
        }
    }
}

#[test]
fn token_cookie_test_vectors() {
    let vectors = load(include_str!("../../test-vectors/responses.json"));

    for case in vectors["tokens"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let headers = case["set_cookie"]
            .as_array()
            .unwrap()
            .iter()
            .map(|cookie| ("set-cookie".to_string(), cookie.as_str().unwrap().to_string()))
            .collect();
        let response = HttpResponse {
            status: 200,
            headers,
            body: String::new(),
        };

        match (case["expected"].as_str(), response::session_token(&response)) {
            (Some(expected), Ok(token)) => assert_eq!(token, expected, "{name}"),
            (None, Err(ClientError::TokenNotFound)) => {}
            (expected, got) => panic!("{name}: expected {expected:?}, got {got:?}"),
        }
    }
}
