//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("{role}:{party_id}:{secret}")
                        .description(Some(
                            "Caller role and party identity with the shared secret. \
                             The secret is set via AUTH_TOKEN.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI document for the whole API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pact API",
        description = "Contract lifecycle and change-proposal negotiation.\n\nAll `/v1/*` endpoints require a bearer token. Health probes and `/metrics` are unauthenticated."
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Contracts ───────────────────────────────────────────────────
        crate::routes::contracts::create_contract,
        crate::routes::contracts::list_contracts,
        crate::routes::contracts::get_active_contract,
        crate::routes::contracts::get_contract,
        crate::routes::contracts::terminate_contract,
        // ── Proposals ───────────────────────────────────────────────────
        crate::routes::proposals::list_proposals,
        crate::routes::proposals::submit_proposal,
        crate::routes::proposals::get_proposal,
        crate::routes::proposals::delete_proposal,
        crate::routes::proposals::accept_proposal,
        crate::routes::proposals::reject_proposal,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::auth::Role,
        crate::routes::contracts::CreateContractRequest,
        crate::routes::contracts::ContractResponse,
        crate::routes::proposals::SubmitProposalRequest,
        crate::routes::proposals::ProposalResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "contracts", description = "Contract creation, lookup and termination"),
        (name = "proposals", description = "Change-proposal negotiation"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/contracts",
            "/v1/contracts/active",
            "/v1/contracts/{id}",
            "/v1/contracts/{id}/terminate",
            "/v1/contracts/{id}/proposals",
            "/v1/proposals/{id}",
            "/v1/proposals/{id}/accept",
            "/v1/proposals/{id}/reject",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn document_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("ContractResponse"));
    }
}
