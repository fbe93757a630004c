use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_hits, User};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn create_user_request(auth: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder().method("POST").uri("/api/users");
    if let Some(auth) = auth {
        builder = builder.header(http::header::AUTHORIZATION, auth);
    }
    builder.body(body.to_string()).unwrap()
}

// --- users ---

#[tokio::test]
async fn create_user_returns_201() {
    let resp = app()
        .oneshot(create_user_request(
            Some("token xxx"),
            r#"{"name": "foo", "email": "foo@example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: User = body_json(resp).await;
    assert_eq!(
        user,
        User {
            id: 10,
            name: "foo".to_string(),
            email: "foo@example.com".to_string(),
        }
    );
}

#[tokio::test]
async fn create_user_requires_authorization() {
    let resp = app()
        .oneshot(create_user_request(None, r#"{"name":"foo","email":"foo@example.com"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "authorization is required"}));
}

#[tokio::test]
async fn create_user_rejects_invalid_body() {
    let resp = app()
        .oneshot(create_user_request(Some("token xxx"), "not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("invalid user"));
}

// --- groups ---

#[tokio::test]
async fn get_group_returns_404_payload() {
    let resp = app().oneshot(get("/api/groups/foo")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "group foo isn't found"}));
}

#[tokio::test]
async fn find_group_by_query() {
    let resp = app().oneshot(get("/api/groups?name=foo")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "group foo isn't found"}));
}

#[tokio::test]
async fn find_group_without_name_is_bad_request() {
    let resp = app().oneshot(get("/api/groups")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- echo / status / headers / query ---

#[tokio::test]
async fn echo_returns_request_bytes_and_content_type() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/echo")
        .header(http::header::CONTENT_TYPE, "text/plain")
        .body("hello\nworld".to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_bytes(resp).await, "hello\nworld");
}

#[tokio::test]
async fn status_route_returns_requested_code() {
    let resp = app().oneshot(get("/api/status/503")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_bytes(resp).await, "status 503");
}

#[tokio::test]
async fn headers_route_lists_repeated_values() {
    let req = Request::builder()
        .uri("/api/headers")
        .header("x-tag", "a")
        .header("x-tag", "b")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    let body: Value = body_json(resp).await;
    assert_eq!(body["x-tag"], json!(["a", "b"]));
}

#[tokio::test]
async fn query_route_echoes_raw_query() {
    let resp = app().oneshot(get("/api/query?b=2&a=1")).await.unwrap();

    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"raw": "b=2&a=1"}));
}

#[tokio::test]
async fn slow_route_waits_before_answering() {
    let started = std::time::Instant::now();
    let resp = app().oneshot(get("/api/slow?ms=50")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(started.elapsed() >= std::time::Duration::from_millis(50));
}

#[tokio::test]
async fn hits_count_every_request() {
    let (router, hits) = app_with_hits();
    router.clone().oneshot(get("/api/groups/foo")).await.unwrap();
    router.oneshot(get("/api/status/200")).await.unwrap();

    assert_eq!(hits.count(), 2);
}
