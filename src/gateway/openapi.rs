//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8000/docs`
//! - OpenAPI JSON: `http://localhost:8000/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::account::CreateAccountRequest;
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    AccountView, DeleteResponse, LoginRequest, LoginResponse, TransferRequest, TransferResponse,
};

/// Bearer token issued by `/api/v1/auth/login`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bank Ledger API",
        version = "1.0.0",
        description = "Accounts and atomic funds transfers. Amounts are decimal strings with two fractional digits."
    ),
    servers(
        (url = "http://localhost:8000", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::account::create_account,
        crate::gateway::handlers::account::get_account,
        crate::gateway::handlers::account::delete_account,
        crate::gateway::handlers::auth::login,
        crate::gateway::handlers::transfer::create_transfer,
    ),
    components(
        schemas(
            HealthResponse,
            CreateAccountRequest,
            AccountView,
            DeleteResponse,
            LoginRequest,
            LoginResponse,
            TransferRequest,
            TransferResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Account", description = "Account lifecycle"),
        (name = "Auth", description = "Token issuance"),
        (name = "Transfer", description = "Funds transfers (auth required)"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
