//! Operation routing and execution framework.
//!
//! This module implements the service-oriented operation pipeline:
//!
//! 1. **Operations** (`operation`): typed variants with static descriptors
//! 2. **Middleware** (`middleware`): Tower layers (admission, metrics,
//!    tenant guard)
//! 3. **Routing** (`router`): Dispatch to domain services by service name
//! 4. **Domain services** (`domain`): cases, alerts, users
//! 5. **Execution** (`executor`): context construction and pipeline entry
//! 6. **Background workers** (`worker`): periodic tenant-scoped jobs

pub mod config;
pub mod domain;
pub mod executor;
pub mod middleware;
pub mod operation;
pub mod router;
pub mod worker;

// Re-export key types for convenient access.
pub use config::ServerConfig;
pub use executor::OperationService;
pub use operation::{
    service_names, Operation, OperationContext, OperationDescriptor, OperationError,
    OperationResponse, TenantRequirement,
};
pub use router::OperationRouter;
pub use worker::{BackgroundRunnable, BackgroundWorker, StaleCaseReports, TenantJob, TenantJobRunner};
