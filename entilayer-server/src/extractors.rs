//! Custom Axum extractors

use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use axum::Json;

use super::error::ApiError;

/// JSON request body whose rejections use the API error envelope.
///
/// A body that is not valid JSON, does not match `T` or is sent without a JSON content
/// type is a 400.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::invalid("Invalid request body", rejection.body_text()))?;

        Ok(Self(value))
    }
}
