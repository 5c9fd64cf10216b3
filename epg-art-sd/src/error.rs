use epg_art_core::CoreError;

/// Errors that can occur while talking to Schedules Direct or running an
/// ingestion pass.
#[derive(Debug, thiserror::Error)]
pub enum SdError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Schedules Direct error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("No valid token; request requires authentication")]
    NotAuthenticated,

    #[error("Too many redirects (stopped after {0})")]
    TooManyRedirects(usize),

    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SdError {
    pub fn api(code: i32, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the service rejected the token itself (expired, invalid,
    /// or flagged), as opposed to the request.
    pub fn is_token_rejection(&self) -> bool {
        matches!(self, Self::Api { code, .. } if crate::types::is_token_error_code(*code))
            || matches!(self, Self::Status { status: 401, .. })
    }
}
