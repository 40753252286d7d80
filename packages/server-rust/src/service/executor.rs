//! Entry point into the operation pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tower::ServiceExt;
use vigil_core::{Principal, RequestContext};

use super::config::ServerConfig;
use super::domain::{AlertService, CaseService, UserService};
use super::middleware::{build_operation_pipeline, OperationPipeline};
use super::operation::{
    service_names, Operation, OperationContext, OperationError, OperationResponse,
};
use super::router::OperationRouter;

/// Builds operation contexts and executes operations through the pipeline.
///
/// Each call clones the pipeline out of the lock and drives it to completion
/// in the caller's task, so the caller's tenant context is what the guard
/// and the data gate observe.
pub struct OperationService {
    pipeline: Mutex<OperationPipeline>,
    config: Arc<ServerConfig>,
    call_id_counter: AtomicU64,
}

impl OperationService {
    #[must_use]
    pub fn new(pipeline: OperationPipeline, config: Arc<ServerConfig>) -> Self {
        Self {
            pipeline: Mutex::new(pipeline),
            config,
            call_id_counter: AtomicU64::new(1),
        }
    }

    /// Registers the three domain services and wraps them in the middleware
    /// stack.
    #[must_use]
    pub fn with_services(
        config: Arc<ServerConfig>,
        cases: CaseService,
        alerts: AlertService,
        users: UserService,
    ) -> Self {
        let mut router = OperationRouter::new();
        router.register(service_names::CASES, Arc::new(cases));
        router.register(service_names::ALERTS, Arc::new(alerts));
        router.register(service_names::USERS, Arc::new(users));
        let pipeline = build_operation_pipeline(router, &config);
        Self::new(pipeline, config)
    }

    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Context for an operation issued on behalf of `principal`.
    #[must_use]
    pub fn context(&self, principal: Principal, request_id: String) -> OperationContext {
        OperationContext::new(
            self.next_call_id(),
            RequestContext {
                node_id: self.config.node_id.clone(),
                principal,
                request_id,
            },
            self.config.default_operation_timeout_ms,
        )
    }

    /// Context for internal work with no inbound request.
    #[must_use]
    pub fn system_context(&self) -> OperationContext {
        OperationContext::new(
            self.next_call_id(),
            RequestContext::system(self.config.node_id.clone()),
            self.config.default_operation_timeout_ms,
        )
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs `op` through the pipeline.
    ///
    /// # Errors
    ///
    /// Whatever the pipeline or the domain service returns.
    pub async fn execute(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        let pipeline = self.pipeline.lock().clone();
        pipeline.oneshot(op).await
    }
}
