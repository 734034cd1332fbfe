use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::endpoints::HealthStatus;
use crate::error::{ApiError, ApiResult};

/// Result of `POST /generate` on the image caption service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionResult {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub caption_hashtags: String,
}

/// Client for the image caption service. It is unauthenticated and has its own,
/// longer timeout.
#[derive(Clone)]
pub struct CaptionClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CaptionClient {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload an image file as multipart field `image`.
    pub async fn generate(&self, image: &Path) -> ApiResult<CaptionResult> {
        let bytes = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        self.generate_from_bytes(&file_name, bytes).await
    }

    pub async fn generate_from_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<CaptionResult> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.as_ref())
            .map_err(|e| ApiError::Config(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let url = format!("{}/generate", self.base_url);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            tracing::error!("Image caption generation failed with {}", status.as_u16());
            return Err(ApiError::from_status(status, "/generate", &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Probe the service root. Unavailability is a value, not an error.
    pub async fn check_service(&self) -> HealthStatus {
        match self.http.get(format!("{}/", self.base_url)).send().await {
            Ok(resp) if resp.status().is_success() => HealthStatus {
                available: true,
                status: "ok".to_string(),
            },
            Ok(resp) => {
                tracing::error!(
                    "Image caption service check failed: status {}",
                    resp.status().as_u16()
                );
                unavailable()
            }
            Err(e) => {
                tracing::error!("Image caption service check failed: {}", e);
                unavailable()
            }
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout.as_secs())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

fn unavailable() -> HealthStatus {
    HealthStatus {
        available: false,
        status: "Image caption service unavailable".to_string(),
    }
}
