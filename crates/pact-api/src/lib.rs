//! # pact-api — Axum API Service
//!
//! HTTP transport for the negotiation engine in `pact-engine`.
//!
//! ## Routes
//!
//! - `/v1/contracts/*` — contract creation, lookup and termination
//! - `/v1/contracts/:id/proposals`, `/v1/proposals/*` — change proposals
//! - `/openapi.json` — OpenAPI document
//! - `/health/*`, `/metrics` — probes and Prometheus metrics (unauthenticated)
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//!
//! Route handlers hold no business logic. They resolve the caller's party
//! from the bearer token, call the engine, and map its errors through
//! [`AppError`].

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use auth::AuthConfig;
use middleware::metrics::ApiMetrics;

/// Assemble the application router.
///
/// Health probes and `/metrics` are mounted outside the auth middleware.
/// Fails only if the metrics registry rejects a collector.
pub fn app(state: AppState) -> Result<Router, prometheus::Error> {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new()?;

    let api = Router::new()
        .merge(routes::contracts::router())
        .merge(routes::proposals::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(axum::Extension(metrics.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(middleware::metrics::metrics_handler))
        .layer(axum::Extension(metrics))
        .with_state(state);

    Ok(Router::new().merge(unauthenticated).merge(api))
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. 503 when the store does not answer.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.health.ping().await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unreachable").into_response()
        }
    }
}
