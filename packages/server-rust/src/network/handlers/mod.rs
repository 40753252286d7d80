//! HTTP handler definitions for the Vigil server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors), the [`Caller`] extractor, and re-exports all handler
//! functions for convenient access when building the router.

pub mod activate;
pub mod admin;
pub mod alert;
pub mod error;
pub mod health;
pub mod panel;

pub use activate::activate_handler;
pub use admin::{create_user_handler, delete_user_handler, list_users_handler, suspend_user_handler};
pub use alert::{alert_status_handler, submit_alert_handler};
pub use error::ApiError;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use panel::{get_case_handler, list_cases_handler, update_case_status_handler};

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use tracing::error;
use vigil_core::{Principal, TenantDirectory};

use super::{NetworkConfig, ShutdownController};
use crate::service::{OperationContext, OperationResponse, OperationService};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Entry point into the operation pipeline.
    pub operations: Arc<OperationService>,
    /// Tenant registry, used to validate the company id on the anonymous
    /// channel.
    pub tenants: Arc<dyn TenantDirectory>,
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Network configuration (bind address, TLS, CORS, timeouts).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

/// Who is calling, as established by the dispatcher.
///
/// Routes the dispatcher leaves without a principal (public routes) extract
/// as `Anonymous`.
#[derive(Debug, Clone)]
pub struct Caller {
    pub principal: Principal,
    pub request_id: String,
}

impl Caller {
    /// Operation context for this caller.
    #[must_use]
    pub fn context(self, operations: &OperationService) -> OperationContext {
        operations.context(self.principal, self.request_id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .unwrap_or(Principal::Anonymous);
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            principal,
            request_id,
        })
    }
}

/// A response variant the handler did not ask for. Indicates a routing bug.
fn unexpected(response: &OperationResponse) -> ApiError {
    error!(?response, "unexpected operation response");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal")
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Instant;

    use vigil_core::{TenantId, TenantRole, UserId, UserStatus};

    use super::AppState;
    use crate::network::{NetworkConfig, ShutdownController};
    use crate::service::domain::{AlertService, CaseService, UserService};
    use crate::service::{OperationService, ServerConfig};
    use crate::storage::{CaseRepository, MemoryCaseStore, MemoryDirectory};
    use crate::tenancy::TenantScopedDataGate;

    /// State over fresh in-memory stores. Tenant 42 ("acme") is active with
    /// an active manager (user 1) and responder (user 3); tenant 43
    /// ("dormant") is inactive.
    pub(crate) fn state() -> (AppState, Arc<MemoryDirectory>) {
        let dir = Arc::new(MemoryDirectory::new());
        let acme = TenantId::new(42).unwrap();
        dir.add_tenant(acme, "acme", true);
        dir.add_tenant(TenantId::new(43).unwrap(), "dormant", false);
        dir.add_user(UserId::new(1).unwrap(), acme, TenantRole::Manager, UserStatus::Active);
        dir.add_user(UserId::new(3).unwrap(), acme, TenantRole::Responder, UserStatus::Active);

        let store: Arc<dyn CaseRepository> = Arc::new(MemoryCaseStore::new());
        let gate = TenantScopedDataGate::new(store);
        let operations = OperationService::with_services(
            Arc::new(ServerConfig::default()),
            CaseService::new(gate.clone()),
            AlertService::new(gate),
            UserService::new(dir.clone(), dir.clone(), dir.clone(), dir.clone()),
        );
        let state = AppState {
            operations: Arc::new(operations),
            tenants: dir.clone(),
            shutdown: Arc::new(ShutdownController::new()),
            config: Arc::new(NetworkConfig::default()),
            start_time: Instant::now(),
        };
        (state, dir)
    }
}
