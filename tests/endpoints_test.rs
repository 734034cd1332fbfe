//! Session, verification, caption and legacy-history calls against a mock
//! backend: paths, query strings, bodies and the bearer header

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use trendmorph::api::ApiClient;
use trendmorph::error::ApiError;

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    body: Option<Value>,
    auth: Option<String>,
}

type Shared = Arc<Mutex<Vec<Seen>>>;

fn record(
    state: &Shared,
    method: Method,
    uri: &Uri,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: Option<Value>,
) {
    state.lock().unwrap().push(Seen {
        method,
        path: uri.path().to_string(),
        query,
        body,
        auth: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
}

async fn session(State(state): State<Shared>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    record(&state, Method::GET, &uri, HashMap::new(), &headers, None);
    Json(json!({"authenticated": true, "user": {"username": "sam"}}))
}

async fn verify(
    State(state): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let valid = body["token"] == "tok";
    record(&state, Method::POST, &uri, HashMap::new(), &headers, Some(body));
    if valid {
        (StatusCode::OK, Json(json!({"valid": true})))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({"detail": "Token is invalid"})))
    }
}

async fn captions(
    State(state): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let niche = params.get("niche").cloned().unwrap_or_default();
    record(&state, Method::GET, &uri, params, &headers, None);
    Json(json!({"captions": [format!("{} all day", niche)]}))
}

async fn delete_message(
    State(state): State<Shared>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> StatusCode {
    record(&state, Method::DELETE, &uri, HashMap::new(), &headers, None);
    if id == "7" {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn backend() -> (ApiClient, Shared) {
    let state: Shared = Arc::default();
    let app = Router::new()
        .route("/api/auth/session", get(session))
        .route("/api/auth/verify", post(verify))
        .route("/api/trends/captions/", get(captions))
        .route("/api/history/{id}", delete(delete_message))
        .with_state(state.clone());
    let api = common::client(&common::spawn_backend(app).await);
    api.session().store("tok", Some("r")).await.unwrap();
    (api, state)
}

fn last(state: &Shared) -> Seen {
    state.lock().unwrap().last().cloned().unwrap()
}

#[tokio::test]
async fn test_current_session_is_fetched_with_bearer() {
    let (api, state) = backend().await;
    let body = assert_ok!(api.current_session().await);
    assert_eq!(body["user"]["username"], "sam");

    let seen = last(&state);
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.path, "/api/auth/session");
    assert_eq!(seen.auth.as_deref(), Some("Bearer tok"));
}

#[tokio::test]
async fn test_verify_token_posts_the_token() {
    let (api, state) = backend().await;
    let body = assert_ok!(api.verify_token("tok").await);
    assert_eq!(body["valid"], true);

    let seen = last(&state);
    assert_eq!(seen.path, "/api/auth/verify");
    assert_eq!(seen.body, Some(json!({"token": "tok"})));
    assert_eq!(seen.auth.as_deref(), Some("Bearer tok"));

    let err = assert_err!(api.verify_token("other").await);
    assert_eq!(err.user_message(), "Token is invalid");
}

#[tokio::test]
async fn test_captions_pass_niche_and_optional_platform() {
    let (api, state) = backend().await;
    let body = assert_ok!(api.captions("Food", Some("Reddit")).await);
    assert_eq!(body["captions"][0], "Food all day");

    let seen = last(&state);
    assert_eq!(seen.path, "/api/trends/captions/");
    assert_eq!(seen.query.get("niche").map(String::as_str), Some("Food"));
    assert_eq!(seen.query.get("platform").map(String::as_str), Some("Reddit"));
    assert_eq!(seen.auth.as_deref(), Some("Bearer tok"));

    assert_ok!(api.captions("Food", None).await);
    assert!(!last(&state).query.contains_key("platform"));
}

#[tokio::test]
async fn test_delete_history_message_targets_the_message() {
    let (api, state) = backend().await;
    assert_ok!(api.delete_history_message("7").await);

    let seen = last(&state);
    assert_eq!(seen.method, Method::DELETE);
    assert_eq!(seen.path, "/api/history/7");
    assert_eq!(seen.auth.as_deref(), Some("Bearer tok"));

    let err = assert_err!(api.delete_history_message("8").await);
    assert!(matches!(err, ApiError::NotFound(_)), "got {:?}", err);
}
