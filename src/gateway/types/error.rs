//! API error type
//!
//! Every handler failure is rendered as
//! `{"code": <int>, "error": "<KIND>", "msg": "<text>"}`. Infrastructure
//! failures are logged in full here and reach the client only as a generic
//! message.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::response::{ApiResponse, error_codes};
use crate::account::{AccountError, IbanError, StoreError};
use crate::auth::AuthError;
use crate::ledger::TransferError;
use crate::money::MoneyError;

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 with the success envelope
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 with the success envelope
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorKind {
    InvalidParameter = error_codes::INVALID_PARAMETER,
    InsufficientFunds = error_codes::INSUFFICIENT_FUNDS,
    InvalidAmount = error_codes::INVALID_AMOUNT,
    InvalidTransfer = error_codes::INVALID_TRANSFER,
    BalanceOverflow = error_codes::BALANCE_OVERFLOW,
    Unauthorized = error_codes::UNAUTHORIZED,
    Forbidden = error_codes::FORBIDDEN,
    AccountNotFound = error_codes::ACCOUNT_NOT_FOUND,
    Conflict = error_codes::CONFLICT,
    InternalError = error_codes::INTERNAL_ERROR,
    StoreUnavailable = error_codes::STORE_UNAVAILABLE,
    LockTimeout = error_codes::LOCK_TIMEOUT,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameter => "INVALID_PARAMETER",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::InvalidAmount => "INVALID_AMOUNT",
            ErrorKind::InvalidTransfer => "INVALID_TRANSFER",
            ErrorKind::BalanceOverflow => "BALANCE_OVERFLOW",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::InternalError => "INTERNAL_ERROR",
            ErrorKind::StoreUnavailable => "STORE_UNAVAILABLE",
            ErrorKind::LockTimeout => "LOCK_TIMEOUT",
        }
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidParameter | ErrorKind::InvalidAmount | ErrorKind::InvalidTransfer => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::InsufficientFunds | ErrorKind::BalanceOverflow => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::AccountNotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::StoreUnavailable | ErrorKind::LockTimeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i32,
    pub error: String,
    pub msg: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub msg: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }

    /// Log `detail` and hide it from the client.
    pub fn internal(detail: impl fmt::Display) -> Self {
        tracing::error!(error = %detail, "Internal error");
        Self::new(ErrorKind::InternalError, "Internal server error")
    }

    pub fn service_unavailable(detail: impl fmt::Display) -> Self {
        tracing::error!(error = %detail, "Store unavailable");
        Self::new(
            ErrorKind::StoreUnavailable,
            "Service temporarily unavailable, please retry later",
        )
    }

    pub fn into_err<T>(self) -> Result<T, ApiError> {
        Err(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.kind.code(),
            error: self.kind.name().to_string(),
            msg: self.msg,
        };
        let mut response = (self.kind.http_status(), Json(body)).into_response();
        if self.kind == ErrorKind::LockTimeout {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let kind = match &e {
            TransferError::InvalidAmount => ErrorKind::InvalidAmount,
            TransferError::InvalidTransfer => ErrorKind::InvalidTransfer,
            TransferError::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            TransferError::InsufficientFunds => ErrorKind::InsufficientFunds,
            TransferError::BalanceOverflow => ErrorKind::BalanceOverflow,
            TransferError::LockTimeout => ErrorKind::LockTimeout,
            TransferError::StoreUnavailable(_) => return ApiError::service_unavailable(&e),
            TransferError::Store(_) => return ApiError::internal(&e),
        };
        ApiError::new(kind, e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::LockTimeout => ApiError::new(ErrorKind::LockTimeout, e.to_string()),
            StoreError::Conflict(_) => ApiError::new(ErrorKind::Conflict, "Resource already exists"),
            StoreError::Unavailable(_) => ApiError::service_unavailable(e),
            StoreError::Database(_) => ApiError::internal(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        if e.is_client_error() {
            ApiError::new(ErrorKind::Unauthorized, e.to_string())
        } else {
            ApiError::internal(e)
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::NotFound(_) => ApiError::new(ErrorKind::AccountNotFound, e.to_string()),
            AccountError::InvalidCredentials => {
                ApiError::new(ErrorKind::Unauthorized, e.to_string())
            }
            AccountError::InvalidInput(msg) => ApiError::bad_request(msg),
            AccountError::IbanSpaceExhausted(_) => ApiError::new(ErrorKind::Conflict, e.to_string()),
            AccountError::Auth(e) => e.into(),
            AccountError::Store(e) => e.into(),
        }
    }
}

impl From<MoneyError> for ApiError {
    fn from(e: MoneyError) -> Self {
        ApiError::new(ErrorKind::InvalidAmount, e.to_string())
    }
}

impl From<IbanError> for ApiError {
    fn from(e: IbanError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::bad_request(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::bad_request(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: ApiError) -> (StatusCode, Option<String>, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, retry_after, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::InvalidParameter.code(), 1001);
        assert_eq!(ErrorKind::InsufficientFunds.code(), 1002);
        assert_eq!(ErrorKind::Conflict.code(), 4090);
        assert_eq!(ErrorKind::LockTimeout.code(), 5002);
        assert_eq!(ErrorKind::Forbidden.name(), "FORBIDDEN");
        assert_eq!(
            ErrorKind::BalanceOverflow.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_lock_timeout_sets_retry_after() {
        let (status, retry_after, body) = render(TransferError::LockTimeout.into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(retry_after.as_deref(), Some("1"));
        assert_eq!(body.error, "LOCK_TIMEOUT");
        assert_eq!(body.code, 5002);
    }

    #[tokio::test]
    async fn test_infrastructure_detail_is_hidden() {
        let err: ApiError = StoreError::Database("relation \"accounts\" does not exist".into()).into();
        let (status, retry_after, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(retry_after.is_none());
        assert_eq!(body.error, "INTERNAL_ERROR");
        assert!(!body.msg.contains("relation"));

        let err: ApiError = TransferError::StoreUnavailable("pool timed out".into()).into();
        let (status, _, body) = render(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error, "STORE_UNAVAILABLE");
        assert!(!body.msg.contains("pool"));
    }

    #[tokio::test]
    async fn test_business_errors_keep_their_message() {
        let (status, _, body) = render(TransferError::InsufficientFunds.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.msg, "Insufficient funds");

        let (status, _, body) = render(AccountError::InvalidCredentials.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error, "UNAUTHORIZED");

        let (status, _, body) = render(MoneyError::Negative.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "INVALID_AMOUNT");
    }
}
