use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// User-facing failure taxonomy for the submission path. Messages here are
// the full client-visible text; raw store errors are logged where they
// occur and never leak through.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ApiError {
    #[error("Name and email are required.")]
    MissingField,

    #[error("{reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("This email is already registered on the waitlist.")]
    DuplicateEmail,

    #[error("Too many requests. Please try again later.")]
    RateLimited { retry_after_secs: i64 },

    #[error("Something went wrong. Please try again.")]
    StoreUnavailable,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingField | ApiError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::RateLimited { retry_after_secs } => json!({
                "error": self.to_string(),
                "retryAfter": retry_after_secs,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after_secs } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}
