use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::client::{ApiClient, ApiRequest};
use crate::chat::types::{ChatMessage, WireMessage};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Tokens returned by login and the OAuth callback.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "access_token")]
    pub access: String,
    #[serde(default, alias = "refresh_token")]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub available: bool,
    pub status: String,
}

/// Body for `POST /api/chat/sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct NewChatSession {
    pub title: String,
    pub niche: Option<String>,
    pub platform: Option<String>,
    pub messages: Vec<WireMessage>,
}

impl ApiClient {
    // Health

    /// Never fails: an unreachable backend is reported in the status.
    pub async fn health(&self) -> HealthStatus {
        match self.send(ApiRequest::get("/health").without_refresh()).await {
            Ok(body) => HealthStatus {
                available: true,
                status: body
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("ok")
                    .to_string(),
            },
            Err(e) => {
                tracing::debug!("Health check against {} failed: {}", self.base_url(), e);
                HealthStatus {
                    available: false,
                    status: "Backend unavailable".to_string(),
                }
            }
        }
    }

    // Authentication

    pub async fn register(&self, registration: &Registration) -> ApiResult<Value> {
        self.send(ApiRequest::post("/api/auth/register", json!(registration)).without_refresh())
            .await
    }

    /// Log in and store both tokens in the session.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<TokenPair> {
        let tokens: TokenPair = self
            .send_json(ApiRequest::post("/api/auth/login", json!(credentials)).without_refresh())
            .await?;
        self.adopt_tokens(&tokens).await?;
        Ok(tokens)
    }

    /// Clear local credentials first, then tell the backend. Backend errors are
    /// logged and ignored.
    pub async fn logout(&self) -> ApiResult<()> {
        let refresh = self.session().refresh_token().await;
        self.session().clear().await?;

        let request =
            ApiRequest::post("/api/auth/logout", json!({ "refresh": refresh })).without_refresh();
        if let Err(e) = self.send(request).await {
            tracing::warn!("Backend logout failed: {}", e);
        }
        Ok(())
    }

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        self.send_json(ApiRequest::get("/api/auth/profile")).await
    }

    pub async fn current_session(&self) -> ApiResult<Value> {
        self.send(ApiRequest::get("/api/auth/session")).await
    }

    pub async fn verify_token(&self, token: &str) -> ApiResult<Value> {
        self.send(ApiRequest::post("/api/auth/verify", json!({ "token": token })))
            .await
    }

    // OAuth

    /// Where the user starts a Google sign-in. The OAuth client id is passed
    /// along when one is configured.
    pub fn google_login_url(&self, client_id: Option<&str>) -> String {
        let base = self.url("/api/auth/google");
        match (client_id, url::Url::parse(&base)) {
            (Some(id), Ok(mut url)) => {
                url.query_pairs_mut().append_pair("client_id", id);
                url.to_string()
            }
            _ => base,
        }
    }

    pub async fn google_callback(&self, code: &str, state: Option<&str>) -> ApiResult<TokenPair> {
        let tokens: TokenPair = self
            .send_json(
                ApiRequest::post(
                    "/api/auth/google/callback",
                    json!({ "code": code, "state": state }),
                )
                .without_refresh(),
            )
            .await?;
        self.adopt_tokens(&tokens).await?;
        Ok(tokens)
    }

    async fn adopt_tokens(&self, tokens: &TokenPair) -> ApiResult<()> {
        self.session()
            .store(&tokens.access, tokens.refresh.as_deref())
            .await?;
        self.route().leave();
        Ok(())
    }

    // Trending content

    pub async fn trending_posts(&self, params: &[(&str, &str)]) -> ApiResult<Value> {
        let request = params
            .iter()
            .fold(ApiRequest::get("/api/trends/"), |req, (k, v)| req.query(k, *v));
        self.send(request).await
    }

    /// Niche-specific data, falling back to the general trends feed when the
    /// niche endpoint does not exist.
    pub async fn niche_data(&self, niche: &str, platform: Option<&str>) -> ApiResult<Value> {
        let path = format!("/api/trends/niche/{}/", niche.to_lowercase());
        match self
            .send(ApiRequest::get(path).query_opt("platform", platform))
            .await
        {
            Err(ApiError::NotFound(_)) => {
                let posts = self.trending_posts(&[("niche", niche)]).await?;
                Ok(json!({ "posts": posts }))
            }
            other => other,
        }
    }

    pub async fn hashtags(&self, niche: &str, platform: Option<&str>) -> ApiResult<Vec<String>> {
        let body = self
            .send(
                ApiRequest::get("/api/trends/hashtags/")
                    .query("niche", niche)
                    .query_opt("platform", platform),
            )
            .await?;
        Ok(body
            .get("hashtags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn captions(&self, niche: &str, platform: Option<&str>) -> ApiResult<Value> {
        self.send(
            ApiRequest::get("/api/trends/captions/")
                .query("niche", niche)
                .query_opt("platform", platform),
        )
        .await
    }

    // Chat sessions

    pub async fn chat_sessions(&self) -> ApiResult<Value> {
        self.send(ApiRequest::get("/api/chat/sessions")).await
    }

    pub async fn session_messages(&self, session_id: &str) -> ApiResult<Value> {
        self.send(ApiRequest::get(format!(
            "/api/chat/sessions/{}/messages",
            session_id
        )))
        .await
    }

    pub async fn create_chat_session(&self, session: &NewChatSession) -> ApiResult<Value> {
        self.send(ApiRequest::post("/api/chat/sessions", json!(session)))
            .await
    }

    pub async fn create_session_message(
        &self,
        session_id: &str,
        message: &ChatMessage,
    ) -> ApiResult<Value> {
        self.send(ApiRequest::post(
            format!("/api/chat/sessions/{}/messages", session_id),
            json!(WireMessage::from(message)),
        ))
        .await
    }

    pub async fn delete_chat_session(&self, session_id: &str) -> ApiResult<()> {
        self.send(ApiRequest::delete(format!("/api/chat/sessions/{}", session_id)))
            .await
            .map(|_| ())
    }

    // Legacy history

    pub async fn history(&self, session_id: Option<&str>) -> ApiResult<Value> {
        self.send(ApiRequest::get("/api/history").query_opt("session", session_id))
            .await
    }

    pub async fn delete_history_message(&self, message_id: &str) -> ApiResult<()> {
        self.send(ApiRequest::delete(format!("/api/history/{}", message_id)))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_pair_accepts_both_field_conventions() {
        let short: TokenPair = serde_json::from_str(r#"{"access":"a","refresh":"r"}"#).unwrap();
        assert_eq!(short.access, "a");
        assert_eq!(short.refresh.as_deref(), Some("r"));

        let long: TokenPair =
            serde_json::from_str(r#"{"access_token":"a","refresh_token":"r"}"#).unwrap();
        assert_eq!(long.access, "a");
        assert_eq!(long.refresh.as_deref(), Some("r"));

        let access_only: TokenPair = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert!(access_only.refresh.is_none());
    }

    #[test]
    fn google_login_url_carries_client_id() {
        let api = ApiClient::new(
            "http://localhost:8000/",
            std::time::Duration::from_secs(5),
            std::sync::Arc::new(crate::auth::SessionContext::in_memory()),
            std::sync::Arc::new(crate::auth::LoginRoute::new()),
        )
        .unwrap();
        assert_eq!(api.google_login_url(None), "http://localhost:8000/api/auth/google");
        assert_eq!(
            api.google_login_url(Some("abc 123")),
            "http://localhost:8000/api/auth/google?client_id=abc+123"
        );
    }

    #[test]
    fn profile_keeps_unknown_fields() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id":7,"username":"sam","plan":"pro"}"#).unwrap();
        assert_eq!(profile.username.as_deref(), Some("sam"));
        assert_eq!(profile.extra["plan"], "pro");
    }
}
