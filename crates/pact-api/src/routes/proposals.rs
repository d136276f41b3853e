//! # Change Proposal Routes
//!
//! - GET    /v1/contracts/:id/proposals — every proposal on a contract
//! - POST   /v1/contracts/:id/proposals — submit a proposal
//! - GET    /v1/proposals/:id — one proposal
//! - DELETE /v1/proposals/:id — withdraw a pending proposal (proposer only)
//! - POST   /v1/proposals/:id/accept — accept (participant only)
//! - POST   /v1/proposals/:id/reject — reject (participant only)
//!
//! All of these act on behalf of the caller's party identity. A caller
//! without one gets 403.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use pact_core::{ContractId, ProposalId};
use pact_state::{ChangeProposal, ProposalDelta};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_path};
use crate::routes::contracts::ContractResponse;
use crate::state::AppState;

/// Assemble the proposals router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/contracts/:id/proposals",
            get(list_proposals).post(submit_proposal),
        )
        .route("/v1/proposals/:id", get(get_proposal).delete(delete_proposal))
        .route("/v1/proposals/:id/accept", post(accept_proposal))
        .route("/v1/proposals/:id/reject", post(reject_proposal))
}

// ── Request / Response DTOs ─────────────────────────────────────────────────

/// Requested changes to a contract's terms. Omitted fields stay as they are;
/// at least one must be set.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SubmitProposalRequest {
    #[serde(default)]
    pub hours_per_week: Option<f64>,
    #[serde(default)]
    pub total_hours: Option<f64>,
    #[serde(default)]
    pub price_per_hour: Option<f64>,
}

impl From<SubmitProposalRequest> for ProposalDelta {
    fn from(req: SubmitProposalRequest) -> Self {
        Self {
            hours_per_week: req.hours_per_week,
            total_hours: req.total_hours,
            price_per_hour: req.price_per_hour,
        }
    }
}

/// Change proposal as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProposalResponse {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub proposer_id: String,
    pub participant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_per_week: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_hour: Option<f64>,
    /// `PENDING`, `ACCEPTED` or `REJECTED`.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChangeProposal> for ProposalResponse {
    fn from(p: ChangeProposal) -> Self {
        Self {
            id: p.id.0,
            contract_id: p.contract_id.0,
            proposer_id: p.proposer_id.into(),
            participant_id: p.participant_id.into(),
            hours_per_week: p.delta.hours_per_week,
            total_hours: p.delta.total_hours,
            price_per_hour: p.delta.price_per_hour,
            status: p.status.as_str().to_string(),
            created_at: *p.created_at.as_datetime(),
            updated_at: *p.updated_at.as_datetime(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// GET /v1/contracts/:id/proposals
#[utoipa::path(
    get,
    path = "/v1/contracts/{id}/proposals",
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Proposals, oldest first", body = Vec<ProposalResponse>),
        (status = 404, description = "Contract not found or not visible", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub(crate) async fn list_proposals(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<ProposalResponse>>, AppError> {
    let contract_id = ContractId(extract_path(id)?);
    let proposals = state
        .engine
        .proposals
        .list_proposals(contract_id, caller.party()?)
        .await?;
    Ok(Json(proposals.into_iter().map(Into::into).collect()))
}

/// POST /v1/contracts/:id/proposals
#[utoipa::path(
    post,
    path = "/v1/contracts/{id}/proposals",
    params(("id" = Uuid, Path, description = "Contract ID")),
    request_body = SubmitProposalRequest,
    responses(
        (status = 201, description = "Proposal submitted", body = ProposalResponse),
        (status = 404, description = "Contract not found", body = crate::error::ErrorBody),
        (status = 409, description = "Contract is not active", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid proposal", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub(crate) async fn submit_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<SubmitProposalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProposalResponse>), AppError> {
    let contract_id = ContractId(extract_path(id)?);
    let delta: ProposalDelta = extract_json(body)?.into();
    let proposal = state
        .engine
        .proposals
        .submit_proposal(contract_id, caller.party()?, delta)
        .await?;
    Ok((StatusCode::CREATED, Json(proposal.into())))
}

/// GET /v1/proposals/:id
#[utoipa::path(
    get,
    path = "/v1/proposals/{id}",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    responses(
        (status = 200, description = "Proposal found", body = ProposalResponse),
        (status = 404, description = "Not found or not visible", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub(crate) async fn get_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ProposalResponse>, AppError> {
    let proposal_id = ProposalId(extract_path(id)?);
    let proposal = state
        .engine
        .proposals
        .get_proposal(proposal_id, caller.party()?)
        .await?;
    Ok(Json(proposal.into()))
}

/// DELETE /v1/proposals/:id
#[utoipa::path(
    delete,
    path = "/v1/proposals/{id}",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    responses(
        (status = 204, description = "Proposal withdrawn"),
        (status = 404, description = "Not found, not pending, or caller is not the proposer", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub(crate) async fn delete_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let proposal_id = ProposalId(extract_path(id)?);
    state
        .engine
        .proposals
        .delete_proposal(proposal_id, caller.party()?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/proposals/:id/accept
#[utoipa::path(
    post,
    path = "/v1/proposals/{id}/accept",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    responses(
        (status = 200, description = "Proposal accepted; returns the updated contract", body = ContractResponse),
        (status = 404, description = "Not found, not pending, or caller is not the participant", body = crate::error::ErrorBody),
        (status = 409, description = "Contract is not active", body = crate::error::ErrorBody),
        (status = 422, description = "Merged terms out of bounds", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub(crate) async fn accept_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ContractResponse>, AppError> {
    let proposal_id = ProposalId(extract_path(id)?);
    let contract = state
        .engine
        .proposals
        .accept_proposal(proposal_id, caller.party()?)
        .await?;
    Ok(Json(contract.into()))
}

/// POST /v1/proposals/:id/reject
#[utoipa::path(
    post,
    path = "/v1/proposals/{id}/reject",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    responses(
        (status = 200, description = "Proposal rejected", body = ProposalResponse),
        (status = 404, description = "Not found, not pending, or caller is not the participant", body = crate::error::ErrorBody),
        (status = 409, description = "Contract is not active", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub(crate) async fn reject_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ProposalResponse>, AppError> {
    let proposal_id = ProposalId(extract_path(id)?);
    let proposal = state
        .engine
        .proposals
        .reject_proposal(proposal_id, caller.party()?)
        .await?;
    Ok(Json(proposal.into()))
}
