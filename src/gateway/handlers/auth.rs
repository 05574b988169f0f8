//! Login handler

use std::sync::Arc;

use axum::extract::State;

use super::super::extract::ApiJson;
use super::super::state::AppState;
use super::super::types::{ApiResult, LoginRequest, LoginResponse, ok};
use crate::account::{AccountError, Iban};

/// Exchange IBAN and password for a bearer token
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse, content_type = "application/json"),
        (status = 401, description = "Invalid IBAN or password")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    // A malformed IBAN is just another unknown IBAN here
    let iban = Iban::parse(&req.iban).map_err(|_| AccountError::InvalidCredentials)?;
    let account = state.accounts.authenticate(&iban, &req.password).await?;
    let issued = state.auth.issue(&account.iban)?;

    tracing::info!(iban = %account.iban, "Login succeeded");
    ok(LoginResponse {
        iban: account.iban.into(),
        token: issued.token,
        expires_at: issued.expires_at,
    })
}
