use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

const GENERIC_FAILURE: &str = "Could not reach the announcement service. Please try again later.";

/// Failures surfaced by the announcement store and composer.
#[derive(Debug, thiserror::Error)]
pub enum AnnouncementError {
    /// Malformed or incomplete draft. Nothing was sent or stored.
    #[error("{0}")]
    Validation(String),

    /// The backing service could not be reached or answered with a non-2xx status.
    #[error("{0}")]
    RemoteUnavailable(String),

    /// The backing service answered, but not with the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The local cache could not be written.
    #[error("cache write failed: {0}")]
    Storage(#[from] std::io::Error),
}

impl AnnouncementError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::RemoteUnavailable(_) => "remote_unavailable",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Storage(_) => "storage",
        }
    }

    /// The single notification shown to a person when anything goes wrong.
    /// Validation and remote errors carry their own text; the rest collapse
    /// into a generic failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::RemoteUnavailable(msg) if !msg.is_empty() => {
                format!("Announcement service error: {msg}")
            }
            _ => GENERIC_FAILURE.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RemoteUnavailable(_) | Self::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AnnouncementError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::Validation(msg) | Self::RemoteUnavailable(msg) => msg.clone(),
            other => {
                tracing::error!(kind = other.kind(), "Announcement request failed: {other}");
                GENERIC_FAILURE.to_string()
            }
        };
        (self.status(), Json(json!({ "error": body }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AnnouncementError>;
