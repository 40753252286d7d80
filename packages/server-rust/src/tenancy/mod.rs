//! Unit-of-work scoped tenant context.
//!
//! - [`store`]: task-local carrier of the current tenant identifier
//! - [`runner`]: "run as tenant X" for background and asynchronous work
//! - [`gate`]: bridge injecting the current tenant into persistence calls

pub mod gate;
pub mod runner;
pub mod store;

pub use gate::{DataGateError, TenantOwned, TenantScopedDataGate};
pub use runner::TenantContextRunner;
pub use store::{TenantContextError, TenantContextGuard, TenantContextStore};
