//! Tower middleware layers for the operation pipeline.
//!
//! - [`admission`]: concurrency ceiling and per-call deadline
//! - [`metrics`]: operation timing and outcome via `tracing` spans
//! - [`tenant_guard`]: per-operation tenant requirement check
//! - [`pipeline`]: composes all layers into a single service stack

pub mod admission;
pub mod metrics;
pub mod pipeline;
pub mod tenant_guard;

pub use admission::AdmissionLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_operation_pipeline, OperationPipeline};
pub use tenant_guard::TenantGuardLayer;
