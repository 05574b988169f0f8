//! Transfer handler

use std::sync::Arc;

use axum::extract::State;

use super::super::extract::ApiJson;
use super::super::state::AppState;
use super::super::types::{ApiResult, TransferRequest, TransferResponse, ok};
use crate::account::Iban;
use crate::auth::AuthenticatedAccount;
use crate::ledger::TransferIntent;
use crate::money;

/// Move funds from the caller's account to another account
///
/// POST /api/v1/transfer
#[utoipa::path(
    post,
    path = "/api/v1/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer committed", body = TransferResponse, content_type = "application/json"),
        (status = 400, description = "Invalid amount, malformed IBAN or self-transfer"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Account not found"),
        (status = 422, description = "Insufficient funds"),
        (status = 503, description = "Lock timeout or store unavailable; retry")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedAccount,
    ApiJson(req): ApiJson<TransferRequest>,
) -> ApiResult<TransferResponse> {
    let destination = Iban::parse(&req.to_account_iban)?;
    let amount = money::parse_minor_units(&req.amount)?;

    let receipt = state
        .engine
        .transfer(TransferIntent {
            source: caller.iban,
            destination,
            amount,
        })
        .await?;

    ok(receipt.into())
}
