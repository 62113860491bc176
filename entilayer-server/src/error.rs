//! API error types with IntoResponse
//!
//! Every error renders as `{ "message": ..., "error"?: ... }` where `error` carries the
//! underlying failure text.

use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed client input (400)
    BadRequest { message: String, error: Option<String> },

    /// No matching entity (404)
    NotFound { message: String },

    /// Datastore failure (500, logged)
    Internal { message: String, error: String },
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), error: None }
    }

    /// A 400 that also reports what was wrong with the input.
    pub fn invalid(message: impl Into<String>, error: impl Display) -> Self {
        Self::BadRequest {
            message: message.into(),
            error: Some(error.to_string()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn internal(message: impl Into<String>, error: impl Display) -> Self {
        Self::Internal {
            message: message.into(),
            error: error.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, error) = match &self {
            Self::BadRequest { message, error } => {
                tracing::warn!(error = error.as_deref(), "{}", message);
                (message.as_str(), error.as_deref())
            }
            Self::NotFound { message } => {
                tracing::warn!("{}", message);
                (message.as_str(), None)
            }
            Self::Internal { message, error } => {
                tracing::error!(error = %error, "{}", message);
                (message.as_str(), Some(error.as_str()))
            }
        };

        (status, Json(ErrorBody { message, error })).into_response()
    }
}
