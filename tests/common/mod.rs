#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use trendmorph::api::ApiClient;
use trendmorph::auth::{LoginRoute, SessionContext};

/// Serve `app` on an ephemeral localhost port and return its base URL.
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Client with an in-memory session against `base_url`.
pub fn client(base_url: &str) -> ApiClient {
    ApiClient::new(
        base_url,
        Duration::from_secs(5),
        Arc::new(SessionContext::in_memory()),
        Arc::new(LoginRoute::new()),
    )
    .unwrap()
}
