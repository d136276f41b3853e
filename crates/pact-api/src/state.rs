//! # Application State
//!
//! Shared state for the Axum application: the negotiation engine, a store
//! handle for the readiness probe, and configuration.

use std::sync::Arc;

use pact_engine::Engine;
use pact_store::{ContractStore, MemoryStore, ProposalStore};

/// Application configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. `None` disables secret checking.
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    /// Pinged by the readiness probe.
    pub health: Arc<dyn ContractStore>,
    pub config: AppConfig,
}

impl AppState {
    /// Default configuration over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(AppConfig::default(), Arc::new(MemoryStore::new()))
    }

    /// Build the engine over `store`.
    pub fn with_store<S>(config: AppConfig, store: Arc<S>) -> Self
    where
        S: ContractStore + ProposalStore + 'static,
    {
        Self {
            engine: Engine::new(store.clone()),
            health: store,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_redacts_token() {
        let config = AppConfig {
            port: 9000,
            auth_token: Some("super-secret".into()),
        };
        let rendered = format!("{config:?}");
        assert!(rendered.contains("9000"));
        assert!(!rendered.contains("super-secret"));
    }

    #[tokio::test]
    async fn memory_state_is_ready() {
        let state = AppState::new();
        assert!(state.health.ping().await.is_ok());
    }
}
