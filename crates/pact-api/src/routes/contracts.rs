//! # Contract Routes
//!
//! - POST /v1/contracts — create a contract
//! - GET  /v1/contracts — contracts the caller is a party to
//! - GET  /v1/contracts/active?counterparty= — the ACTIVE contract with a counterparty
//! - GET  /v1/contracts/:id — one contract (parties and admins)
//! - POST /v1/contracts/:id/terminate — terminate a contract
//!
//! Non-parties get 404 for contracts they cannot see, never 403.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use pact_core::{ContractId, PartyId, Timestamp};
use pact_state::{Contract, ContractDraft, ContractTerms};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_path, extract_query};
use crate::state::AppState;

/// Assemble the contracts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/contracts", post(create_contract).get(list_contracts))
        .route("/v1/contracts/active", get(get_active_contract))
        .route("/v1/contracts/:id", get(get_contract))
        .route("/v1/contracts/:id/terminate", post(terminate_contract))
}

// ── Request / Response DTOs ─────────────────────────────────────────────────

/// Request to open a contract between two parties.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContractRequest {
    pub party_a: String,
    pub party_b: String,
    /// Defaults to now.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Defaults to `start_date` plus the whole weeks the workload needs.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub hours_per_week: f64,
    pub total_hours: f64,
    pub price_per_hour: f64,
}

impl CreateContractRequest {
    fn into_draft(self) -> Result<ContractDraft, AppError> {
        Ok(ContractDraft {
            party_a: PartyId::new(self.party_a)?,
            party_b: PartyId::new(self.party_b)?,
            start_date: self.start_date.map(Timestamp::from_utc),
            end_date: self.end_date.map(Timestamp::from_utc),
            terms: ContractTerms {
                hours_per_week: self.hours_per_week,
                total_hours: self.total_hours,
                price_per_hour: self.price_per_hour,
            },
        })
    }
}

/// Query for the active-contract lookup.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActiveQuery {
    /// The other party.
    pub counterparty: String,
}

/// Contract as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContractResponse {
    pub id: Uuid,
    pub party_a: String,
    pub party_b: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub hours_per_week: f64,
    pub total_hours: f64,
    pub price_per_hour: f64,
    /// `ACTIVE` or `TERMINATED`.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Contract> for ContractResponse {
    fn from(c: Contract) -> Self {
        Self {
            id: c.id.0,
            party_a: c.party_a.into(),
            party_b: c.party_b.into(),
            start_date: *c.start_date.as_datetime(),
            end_date: *c.end_date.as_datetime(),
            hours_per_week: c.hours_per_week,
            total_hours: c.total_hours,
            price_per_hour: c.price_per_hour,
            status: c.status.as_str().to_string(),
            created_at: *c.created_at.as_datetime(),
            updated_at: *c.updated_at.as_datetime(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /v1/contracts
#[utoipa::path(
    post,
    path = "/v1/contracts",
    request_body = CreateContractRequest,
    responses(
        (status = 201, description = "Contract created", body = ContractResponse),
        (status = 403, description = "Caller is not one of the parties", body = crate::error::ErrorBody),
        (status = 409, description = "Parties already have an active contract", body = crate::error::ErrorBody),
        (status = 422, description = "Terms out of bounds", body = crate::error::ErrorBody),
    ),
    tag = "contracts"
)]
pub(crate) async fn create_contract(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateContractRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ContractResponse>), AppError> {
    let draft = extract_json(body)?.into_draft()?;

    if !caller.is_admin() {
        let me = caller.party()?;
        if me != &draft.party_a && me != &draft.party_b {
            return Err(AppError::Forbidden(
                "caller must be one of the contract parties".into(),
            ));
        }
    }

    let contract = state.engine.contracts.create_contract(draft).await?;
    Ok((StatusCode::CREATED, Json(contract.into())))
}

/// GET /v1/contracts
#[utoipa::path(
    get,
    path = "/v1/contracts",
    responses(
        (status = 200, description = "Caller's contracts, newest first", body = Vec<ContractResponse>),
        (status = 403, description = "Caller has no party identity", body = crate::error::ErrorBody),
    ),
    tag = "contracts"
)]
pub(crate) async fn list_contracts(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<ContractResponse>>, AppError> {
    let contracts = state
        .engine
        .contracts
        .contracts_for_party(caller.party()?)
        .await?;
    Ok(Json(contracts.into_iter().map(Into::into).collect()))
}

/// GET /v1/contracts/active
#[utoipa::path(
    get,
    path = "/v1/contracts/active",
    params(ActiveQuery),
    responses(
        (status = 200, description = "Active contract with the counterparty", body = ContractResponse),
        (status = 404, description = "No active contract", body = crate::error::ErrorBody),
    ),
    tag = "contracts"
)]
pub(crate) async fn get_active_contract(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ActiveQuery>, QueryRejection>,
) -> Result<Json<ContractResponse>, AppError> {
    let counterparty = PartyId::new(extract_query(query)?.counterparty)?;
    let contract = state
        .engine
        .contracts
        .get_active_contract(caller.party()?, &counterparty)
        .await?;
    Ok(Json(contract.into()))
}

/// GET /v1/contracts/:id
#[utoipa::path(
    get,
    path = "/v1/contracts/{id}",
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract found", body = ContractResponse),
        (status = 404, description = "Not found or not visible", body = crate::error::ErrorBody),
    ),
    tag = "contracts"
)]
pub(crate) async fn get_contract(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ContractResponse>, AppError> {
    let id = ContractId(extract_path(id)?);
    let contract = if caller.is_admin() {
        state.engine.contracts.get_contract(id).await?
    } else {
        state
            .engine
            .contracts
            .get_visible_contract(id, caller.party()?)
            .await?
    };
    Ok(Json(contract.into()))
}

/// POST /v1/contracts/:id/terminate
#[utoipa::path(
    post,
    path = "/v1/contracts/{id}/terminate",
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract terminated (idempotent)", body = ContractResponse),
        (status = 404, description = "Not found or not visible", body = crate::error::ErrorBody),
    ),
    tag = "contracts"
)]
pub(crate) async fn terminate_contract(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ContractResponse>, AppError> {
    let id = ContractId(extract_path(id)?);
    if !caller.is_admin() {
        state
            .engine
            .contracts
            .get_visible_contract(id, caller.party()?)
            .await?;
    }
    let contract = state.engine.contracts.terminate_contract(id).await?;
    Ok(Json(contract.into()))
}
