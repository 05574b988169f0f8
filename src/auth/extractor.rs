//! `AuthenticatedAccount` as an axum extractor
//!
//! Handlers that need a caller take it as an explicit argument; there is no
//! middleware stashing identity in request extensions.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;

use super::error::AuthError;
use super::gate::AuthenticatedAccount;
use crate::gateway::state::AppState;
use crate::gateway::types::ApiError;

impl FromRequestParts<Arc<AppState>> for AuthenticatedAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedHeader)?),
            None => None,
        };
        Ok(state.auth.verify_header(header)?)
    }
}
