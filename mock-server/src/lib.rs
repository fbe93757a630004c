use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct SlowParams {
    #[serde(default = "default_delay_ms")]
    pub ms: u64,
}

fn default_delay_ms() -> u64 {
    2000
}

/// Number of requests the server has seen, across all routes.
#[derive(Clone, Debug, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn app() -> Router {
    app_with_hits().0
}

pub fn app_with_hits() -> (Router, Hits) {
    let hits = Hits::default();
    let router = Router::new()
        .route("/api/users", post(create_user))
        .route("/api/groups", get(find_group))
        .route("/api/groups/{name}", get(get_group))
        .route("/api/echo", post(echo))
        .route("/api/status/{code}", get(status))
        .route("/api/slow", get(slow))
        .route("/api/headers", get(headers))
        .route("/api/query", get(query))
        .layer(middleware::from_fn_with_state(hits.clone(), count_hits));
    (router, hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

async fn count_hits(State(hits): State<Hits>, request: Request, next: Next) -> Response {
    hits.0.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

fn error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn new_user(input: CreateUser) -> User {
    User {
        id: 10,
        name: input.name,
        email: input.email,
    }
}

/// Requires an `Authorization` header; the body is parsed by hand so any
/// content type is accepted.
async fn create_user(headers: HeaderMap, body: Bytes) -> Response {
    if !headers.contains_key(header::AUTHORIZATION) {
        return error(StatusCode::UNAUTHORIZED, "authorization is required".to_string());
    }
    match serde_json::from_slice::<CreateUser>(&body) {
        Ok(input) => (StatusCode::CREATED, Json(new_user(input))).into_response(),
        Err(e) => error(StatusCode::BAD_REQUEST, format!("invalid user: {e}")),
    }
}

async fn get_group(Path(name): Path<String>) -> Response {
    error(StatusCode::NOT_FOUND, format!("group {name} isn't found"))
}

async fn find_group(Query(params): Query<BTreeMap<String, String>>) -> Response {
    match params.get("name") {
        Some(name) => error(StatusCode::NOT_FOUND, format!("group {name} isn't found")),
        None => error(StatusCode::BAD_REQUEST, "name is required".to_string()),
    }
}

async fn echo(headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => error(StatusCode::BAD_REQUEST, format!("invalid status {code}")),
    }
}

async fn slow(Query(params): Query<SlowParams>) -> (StatusCode, Json<User>) {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    let user = new_user(CreateUser {
        name: "foo".to_string(),
        email: "foo@example.com".to_string(),
    });
    (StatusCode::CREATED, Json(user))
}

async fn headers(headers: HeaderMap) -> Json<BTreeMap<String, Vec<String>>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        out.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(out)
}

async fn query(RawQuery(raw): RawQuery) -> Json<serde_json::Value> {
    Json(json!({ "raw": raw }))
}
