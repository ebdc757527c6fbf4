use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{app::build_app, state::AppState};

/// Router over an in-memory store, plus the state for direct inspection.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::fake();
        let router = build_app(state.clone()).expect("app should build");
        Self { router, state }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> TestResponse {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("request");
    dispatch(app, req).await
}

pub async fn send_with_cookie(app: &TestApp, uri: &str, cookie: &str) -> TestResponse {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request");
    dispatch(app, req).await
}

async fn dispatch(app: &TestApp, req: Request<Body>) -> TestResponse {
    let res = app.router.clone().oneshot(req).await.expect("infallible");
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn register(app: &TestApp, username: &str, email: Option<&str>, password: &str) {
    let res = send(
        app,
        Method::POST,
        "/api/register",
        Some(json!({"username": username, "email": email, "password": password})),
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED, "register {username}: {}", res.body);
}

pub async fn login(app: &TestApp, username: &str, password: &str) -> String {
    let res = send(
        app,
        Method::POST,
        "/api/login",
        Some(json!({"username": username, "password": password})),
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "login {username}: {}", res.body);
    res.body["token"].as_str().expect("token").to_string()
}
