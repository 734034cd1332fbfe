use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{LoginRoute, RequestAuth, SessionContext};
use crate::error::{ApiError, ApiResult};

pub const REFRESH_PATH: &str = "/api/auth/token/refresh/";

/// A request description that can be dispatched more than once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Return a 401 as-is instead of refreshing. Used by login/register/logout.
    pub skip_refresh: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            skip_refresh: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).json(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Add a query parameter only when `value` is present.
    pub fn query_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn without_refresh(mut self) -> Self {
        self.skip_refresh = true;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(alias = "access_token")]
    access: String,
}

/// HTTP client that attaches the session's bearer token and recovers from an
/// expired access token by refreshing it once.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    /// Backend that issues tokens. Kept when the client is rebased.
    auth_url: String,
    timeout: Duration,
    session: Arc<SessionContext>,
    route: Arc<LoginRoute>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<SessionContext>,
        route: Arc<LoginRoute>,
    ) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            http,
            auth_url: base_url.clone(),
            base_url,
            timeout,
            session,
            route,
        })
    }

    /// Same session and login route, different backend. Token refresh still
    /// goes to the backend the client was created for.
    pub fn with_base_url(&self, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn route(&self) -> &Arc<LoginRoute> {
        &self.route
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a request and decode the JSON body into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let value = self.send(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Send a request, refreshing the access token at most once on a 401.
    ///
    /// An empty success body is returned as `Value::Null`.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        let mut token = self.session.access_token().await;
        let mut auth = RequestAuth::start(token.is_some());

        loop {
            let response = self.dispatch(&request, token.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED || request.skip_refresh {
                return self.finish(&request, response).await;
            }

            auth = match auth.begin_refresh() {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!("{} still unauthorized after refresh: {}", request.path, e);
                    return Err(ApiError::Unauthorized);
                }
            };

            match self.refresh_access_token().await {
                Ok(fresh) => {
                    auth = auth
                        .refresh_succeeded()
                        .map_err(|e| ApiError::AuthInvalid(e.to_string()))?;
                    tracing::debug!("Resubmitting {} ({})", request.path, auth.state_name());
                    token = Some(fresh);
                }
                Err(err) => {
                    let failed = auth.fail();
                    tracing::warn!(
                        "Refresh for {} failed ({}): {}",
                        request.path,
                        failed.state_name(),
                        err
                    );
                    self.expire_session().await;
                    return Err(err);
                }
            }
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let url = self.url(&request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder.send().await.map_err(|e| self.transport_error(e))
    }

    async fn finish(&self, request: &ApiRequest, response: reqwest::Response) -> ApiResult<Value> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&body)?);
        }

        if status == StatusCode::NOT_FOUND {
            tracing::warn!("Endpoint not found: {}", request.path);
        } else if status.is_server_error() {
            tracing::error!(
                "Server error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            );
        }

        Err(ApiError::from_status(status, &request.path, &body))
    }

    /// Exchange the stored refresh token for a new access token.
    /// Sent outside the interceptor so a failing refresh never recurses.
    async fn refresh_access_token(&self) -> ApiResult<String> {
        let refresh = self
            .session
            .refresh_token()
            .await
            .ok_or_else(|| ApiError::AuthInvalid("No refresh token".to_string()))?;

        tracing::info!("Access token rejected, attempting refresh");
        let response = self
            .http
            .post(format!("{}{}", self.auth_url, REFRESH_PATH))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await
            .map_err(|e| ApiError::AuthInvalid(format!("Refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::AuthInvalid(format!(
                "Refresh rejected with status {}",
                response.status().as_u16()
            )));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::AuthInvalid(format!("Malformed refresh response: {}", e)))?;

        if let Err(e) = self.session.set_access_token(&body.access).await {
            tracing::warn!("Could not persist refreshed access token: {}", e);
        }
        tracing::info!("Access token refreshed");
        Ok(body.access)
    }

    /// Terminal auth failure: forget credentials and send the user to login.
    async fn expire_session(&self) {
        if let Err(e) = self.session.clear().await {
            tracing::warn!("Could not clear stored tokens: {}", e);
        }
        self.route.redirect();
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            tracing::error!("Request timed out: {}", err);
            ApiError::Timeout(self.timeout.as_secs())
        } else {
            tracing::error!("Network error: {}", err);
            ApiError::Network(err.to_string())
        }
    }
}
