//! Account handlers (open, view, close)

use std::sync::Arc;

use axum::extract::{Path, State, rejection::PathRejection};

use super::super::extract::ApiJson;
use super::super::state::AppState;
use super::super::types::{AccountView, ApiError, ApiResult, DeleteResponse, created, ok};
use crate::account::CreateAccountRequest;
use crate::auth::AuthenticatedAccount;

/// Open an account
///
/// POST /api/v1/accounts
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountView, content_type = "application/json"),
        (status = 400, description = "Invalid names, password or opening balance"),
        (status = 409, description = "Could not allocate a unique IBAN")
    ),
    tag = "Account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateAccountRequest>,
) -> ApiResult<AccountView> {
    let account = state.accounts.create(req).await?;
    created(account.into())
}

/// Get an account by id
///
/// GET /api/v1/accounts/{id}
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(
        ("id" = i64, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Account details", body = AccountView, content_type = "application/json"),
        (status = 404, description = "Account not found")
    ),
    tag = "Account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<AccountView> {
    let Path(id) = path?;
    let account = state.accounts.get(id).await?;
    ok(account.into())
}

/// Close the caller's own account
///
/// DELETE /api/v1/accounts/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{id}",
    params(
        ("id" = i64, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Account deleted", body = DeleteResponse, content_type = "application/json"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Account belongs to someone else"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedAccount,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeleteResponse> {
    let Path(id) = path?;
    let account = state.accounts.get(id).await?;
    if account.iban != caller.iban {
        tracing::warn!(account_id = id, caller = %caller.iban, "Refused to delete a foreign account");
        return ApiError::forbidden("Accounts can only be deleted by their owner").into_err();
    }

    state.accounts.delete(id).await?;
    ok(DeleteResponse { deleted: id })
}
