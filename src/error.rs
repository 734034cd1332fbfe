use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error. Please check your connection and ensure the backend server is running.")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Authentication invalid: {0}")]
    AuthInvalid(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request failed with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Classify a non-success HTTP status. `body` is the raw response body, which
    /// may carry a `detail`/`error` message from the backend.
    pub fn from_status(status: StatusCode, url: &str, body: &str) -> Self {
        let message = backend_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::NOT_FOUND => ApiError::NotFound(url.to_string()),
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                message,
            },
            s => ApiError::Status {
                status: s.as_u16(),
                message,
            },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::Server { status, .. } | ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the caller has been sent back to the login flow.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::AuthInvalid(_) | ApiError::Unauthorized)
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } | ApiError::Server { message, .. } => message.clone(),
            ApiError::AuthInvalid(_) => {
                "Your session has expired. Please log in again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Pull a human readable message out of a backend error body.
/// Checks `detail`, then `non_field_errors[0]`, then `error`.
fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(detail) = value.get("detail").and_then(|v| v.as_str()) {
        return Some(detail.to_string());
    }
    if let Some(first) = value
        .get("non_field_errors")
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
    {
        return Some(first.to_string());
    }
    value
        .get("error")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

pub type ApiResult<T> = Result<T, ApiError>;
