//! In-memory stand-in for the Beaker API.
//!
//! Serves generic resource collections keyed by id or name, cursor paging,
//! token issuance through a cookie and a few fault endpoints used to
//! exercise client retries and redirects. Resources are stored as raw JSON
//! objects so patches merge field by field exactly as sent.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Collections the server knows about.
pub const COLLECTIONS: [&str; 4] = ["clusters", "datasets", "experiments", "workspaces"];

/// Page size used when a list request has no `limit`.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Cookie carrying a freshly issued session token.
pub const TOKEN_COOKIE: &str = "User-Token";

pub type Object = Map<String, Value>;

#[derive(Default)]
pub struct Store {
    collections: HashMap<String, Vec<Object>>,
    fault_hits: HashMap<String, u32>,
}

pub type Db = Arc<RwLock<Store>>;

/// Error document matching the client's `ApiError`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub data: Vec<Object>,
    pub next_cursor: String,
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default)]
    cursor: String,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct FaultParams {
    failures: Option<u32>,
}

struct Failure(StatusCode, String);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.0.as_u16(),
            message: self.1,
        };
        (self.0, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/v3/user", get(whoami))
        .route("/api/v3/auth/tokens", post(generate_token))
        .route("/api/v3/faults/unavailable/{key}", get(unavailable))
        .route("/api/v3/faults/redirect", get(redirect))
        .route("/api/v3/faults/loop", get(redirect_loop))
        .route("/api/v3/{collection}", get(list).post(create))
        .route(
            "/api/v3/{collection}/{reference}",
            get(get_one).patch(patch_one).delete(delete_one),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn collection_name(collection: &str) -> Result<(), Failure> {
    if COLLECTIONS.contains(&collection) {
        Ok(())
    } else {
        Err(Failure(
            StatusCode::NOT_FOUND,
            format!("unknown collection {collection:?}"),
        ))
    }
}

fn matches_reference(object: &Object, reference: &str) -> bool {
    ["id", "name"]
        .iter()
        .any(|key| object.get(*key).and_then(Value::as_str) == Some(reference))
}

fn singular(collection: &str) -> &str {
    collection.strip_suffix('s').unwrap_or(collection)
}

async fn whoami(headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty());
    match token {
        Some(_) => Ok(Json(serde_json::json!({
            "id": "us_01",
            "name": "ana",
            "displayName": "Ana",
        }))),
        None => Err(Failure(StatusCode::UNAUTHORIZED, "authentication required".into())),
    }
}

async fn generate_token() -> impl IntoResponse {
    let cookie = format!("{TOKEN_COOKIE}={}; Path=/; HttpOnly", Uuid::new_v4().simple());
    (StatusCode::OK, [(header::SET_COOKIE, cookie)])
}

async fn unavailable(
    State(db): State<Db>,
    Path(key): Path<String>,
    Query(params): Query<FaultParams>,
) -> Result<Json<Value>, Failure> {
    let failures = params.failures.unwrap_or(2);
    let mut store = db.write().await;
    let hits = store.fault_hits.entry(key).or_insert(0);
    *hits += 1;
    if *hits <= failures {
        tracing::debug!(hits = *hits, failures, "injecting 503");
        return Err(Failure(
            StatusCode::SERVICE_UNAVAILABLE,
            "service unavailable".into(),
        ));
    }
    Ok(Json(serde_json::json!({ "attempts": *hits })))
}

async fn redirect() -> Redirect {
    Redirect::temporary("/api/v3/user")
}

async fn redirect_loop() -> Redirect {
    Redirect::temporary("/api/v3/faults/loop")
}

async fn list(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page>, Failure> {
    collection_name(&collection)?;
    let start = if params.cursor.is_empty() {
        0
    } else {
        params
            .cursor
            .parse::<usize>()
            .map_err(|_| Failure(StatusCode::BAD_REQUEST, format!("invalid cursor {:?}", params.cursor)))?
    };
    let limit = params.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_SIZE);

    let store = db.read().await;
    let objects = store.collections.get(&collection).map(Vec::as_slice).unwrap_or(&[]);
    let end = start.saturating_add(limit).min(objects.len());
    let data = objects.get(start..end).map(<[Object]>::to_vec).unwrap_or_default();
    let next_cursor = if end < objects.len() {
        end.to_string()
    } else {
        String::new()
    };
    Ok(Json(Page { data, next_cursor }))
}

async fn create(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Json(mut input): Json<Object>,
) -> Result<(StatusCode, Json<Object>), Failure> {
    collection_name(&collection)?;
    let mut store = db.write().await;
    let objects = store.collections.entry(collection.clone()).or_default();
    if let Some(name) = input.get("name").and_then(Value::as_str) {
        if objects.iter().any(|o| matches_reference(o, name)) {
            return Err(Failure(
                StatusCode::CONFLICT,
                format!("{} {name:?} already exists", singular(&collection)),
            ));
        }
    }
    input.insert(
        "id".to_string(),
        Value::String(format!("{}_{}", &singular(&collection)[..2], Uuid::new_v4().simple())),
    );
    objects.push(input.clone());
    Ok((StatusCode::CREATED, Json(input)))
}

async fn get_one(
    State(db): State<Db>,
    Path((collection, reference)): Path<(String, String)>,
) -> Result<Json<Object>, Failure> {
    collection_name(&collection)?;
    let store = db.read().await;
    store
        .collections
        .get(&collection)
        .and_then(|objects| objects.iter().find(|o| matches_reference(o, &reference)))
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(&collection, &reference))
}

async fn patch_one(
    State(db): State<Db>,
    Path((collection, reference)): Path<(String, String)>,
    Json(patch): Json<Object>,
) -> Result<Json<Object>, Failure> {
    collection_name(&collection)?;
    let mut store = db.write().await;
    let objects = store.collections.entry(collection.clone()).or_default();
    let index = objects
        .iter()
        .position(|o| matches_reference(o, &reference))
        .ok_or_else(|| not_found(&collection, &reference))?;

    if let Some(name) = patch.get("name").and_then(Value::as_str) {
        let taken = objects
            .iter()
            .enumerate()
            .any(|(i, o)| i != index && matches_reference(o, name));
        if taken {
            return Err(Failure(
                StatusCode::CONFLICT,
                format!("{} {name:?} already exists", singular(&collection)),
            ));
        }
    }

    let object = &mut objects[index];
    for (key, value) in patch {
        if key != "id" && !value.is_null() {
            object.insert(key, value);
        }
    }
    Ok(Json(object.clone()))
}

async fn delete_one(
    State(db): State<Db>,
    Path((collection, reference)): Path<(String, String)>,
) -> Result<StatusCode, Failure> {
    collection_name(&collection)?;
    let mut store = db.write().await;
    let objects = store.collections.entry(collection.clone()).or_default();
    let index = objects
        .iter()
        .position(|o| matches_reference(o, &reference))
        .ok_or_else(|| not_found(&collection, &reference))?;
    objects.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

fn not_found(collection: &str, reference: &str) -> Failure {
    Failure(
        StatusCode::NOT_FOUND,
        format!("{} {reference:?} not found", singular(collection)),
    )
}
