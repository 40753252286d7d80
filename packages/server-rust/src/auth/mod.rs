//! Dual authentication: admin and tenant pipelines selected by path.
//!
//! 1. **Dispatch** (`dispatch`): path -> exactly one of {admin, tenant}
//! 2. **Codec** (`codec`): bearer token -> typed claims, one codec per domain
//! 3. **Resolution** (`resolver`): claims -> principal, with freshness checks
//! 4. **Pipelines** (`pipeline`): codec + resolver per domain, no shared state
//!
//! Failures are classified in `error` and logged through `security`.

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod security;

pub use codec::{CodecError, TokenCodec};
pub use config::AuthConfig;
pub use dispatch::{dispatch, ChainDispatcher, PathPartition, Route, TenantPolicy};
pub use error::AuthError;
pub use pipeline::{AdminPipeline, TenantPipeline};
pub use resolver::{AdminResolver, ResolveError, TenantResolver};
pub use security::{SecurityEvents, SECURITY_TARGET};
