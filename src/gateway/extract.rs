//! Request extractors whose rejections use the API error envelope

use axum::Json;
use axum::extract::{FromRequest, Request, rejection::JsonRejection};

use super::types::ApiError;

/// `Json<T>` with malformed bodies reported as `INVALID_PARAMETER`.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}
