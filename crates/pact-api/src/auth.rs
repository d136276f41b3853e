//! # Authentication Middleware
//!
//! Bearer tokens carry the caller's role and party identity:
//!
//! ```text
//! Bearer {role}:{party_id}:{secret}
//! ```
//!
//! `role` is `company`, `student` or `admin`. `party_id` is the opaque
//! identifier issued by the identity layer; it may be empty only for
//! `admin`. The secret is compared in constant time against the configured
//! token.
//!
//! Every request that passes gets a [`CallerIdentity`] in its extensions.
//! Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use pact_core::PartyId;

use crate::error::{error_response, AppError};

// ── Role ────────────────────────────────────────────────────────────────────

/// Kind of caller. Engine operations ignore it; the transport uses
/// `Admin` for cross-party contract administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Company,
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    /// Always present for `Company` and `Student`.
    pub party_id: Option<PartyId>,
}

impl CallerIdentity {
    /// The identity used when authentication is disabled and no usable
    /// token was sent.
    pub fn anonymous_admin() -> Self {
        Self {
            role: Role::Admin,
            party_id: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The caller's party, or 403 if the caller has none.
    pub fn party(&self) -> Result<&PartyId, AppError> {
        self.party_id
            .as_ref()
            .ok_or_else(|| AppError::Forbidden("caller has no party identity".into()))
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse `{role}:{party_id}:{secret}`.
///
/// With `expected_secret = None` the secret is not checked.
pub fn parse_bearer_token(
    provided: &str,
    expected_secret: Option<&str>,
) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    let [role_str, party_str, secret] = parts.as_slice() else {
        return Err("invalid token format, expected {role}:{party_id}:{secret}".into());
    };

    if let Some(expected) = expected_secret {
        if !constant_time_token_eq(secret, expected) {
            return Err("invalid bearer token".into());
        }
    }

    let role = match *role_str {
        "company" => Role::Company,
        "student" => Role::Student,
        "admin" => Role::Admin,
        other => return Err(format!("unknown role: {other}")),
    };

    let party_id = if party_str.trim().is_empty() {
        None
    } else {
        Some(PartyId::new(*party_str).map_err(|e| format!("invalid party_id: {e}"))?)
    };
    if party_id.is_none() && role != Role::Admin {
        return Err(format!("role '{}' requires a party_id", role.as_str()));
    }

    Ok(CallerIdentity { role, party_id })
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the bearer token and inject the [`CallerIdentity`].
///
/// When `AuthConfig.token` is `None` the secret is not checked: a
/// well-formed token still selects the identity, anything else runs as
/// [`CallerIdentity::anonymous_admin`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let identity = match (expected.as_deref(), provided.as_deref()) {
        (Some(expected), Some(value)) => match value.strip_prefix("Bearer ") {
            Some(token) => match parse_bearer_token(token, Some(expected)) {
                Ok(identity) => identity,
                Err(msg) => {
                    tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                    return unauthorized_response(&msg);
                }
            },
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                return unauthorized_response("authorization header must use Bearer scheme");
            }
        },
        (Some(_), None) => {
            tracing::warn!("authentication failed: missing authorization header");
            return unauthorized_response("missing authorization header");
        }
        (None, provided) => provided
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| parse_bearer_token(token, None).ok())
            .unwrap_or_else(CallerIdentity::anonymous_admin),
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn unauthorized_response(message: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
}
