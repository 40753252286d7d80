//! Domain services.
//!
//! Each service is a plain struct with an async `handle` method; the
//! `domain_service!` macro exposes it as a `tower::Service<Operation>` on
//! `Arc<Self>` so it can be registered with the router.

use vigil_core::{AdminPrincipal, Principal, TenantUserPrincipal};

use crate::service::operation::{OperationContext, OperationError};

/// Implements `tower::Service<Operation>` for `Arc<$name>` by delegating to
/// `$name::handle`.
macro_rules! domain_service {
    ($name:ident) => {
        impl tower::Service<crate::service::operation::Operation> for std::sync::Arc<$name> {
            type Response = crate::service::operation::OperationResponse;
            type Error = crate::service::operation::OperationError;
            type Future = std::pin::Pin<
                Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
            >;

            fn poll_ready(
                &mut self,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<Result<(), Self::Error>> {
                std::task::Poll::Ready(Ok(()))
            }

            fn call(&mut self, op: crate::service::operation::Operation) -> Self::Future {
                let service = std::sync::Arc::clone(self);
                Box::pin(async move { service.handle(op).await })
            }
        }
    };
}

pub mod alerts;
pub mod cases;
pub mod users;

pub use alerts::AlertService;
pub use cases::CaseService;
pub use users::UserService;

fn forbidden(ctx: &OperationContext, operation: &'static str) -> OperationError {
    OperationError::Forbidden {
        operation,
        principal: ctx.request.principal.kind(),
    }
}

/// The caller must be a resolved staff member of a tenant.
fn require_staff<'a>(
    ctx: &'a OperationContext,
    operation: &'static str,
) -> Result<&'a TenantUserPrincipal, OperationError> {
    match &ctx.request.principal {
        Principal::TenantUser(user) if user.role.is_staff() => Ok(user),
        _ => Err(forbidden(ctx, operation)),
    }
}

/// The caller must be a platform administrator.
fn require_admin<'a>(
    ctx: &'a OperationContext,
    operation: &'static str,
) -> Result<&'a AdminPrincipal, OperationError> {
    match &ctx.request.principal {
        Principal::Admin(admin) => Ok(admin),
        _ => Err(forbidden(ctx, operation)),
    }
}

/// The caller must be the anonymous whistleblower channel. Internal work
/// runs as `Principal::System` and is refused here like any other caller.
fn require_anonymous(ctx: &OperationContext, operation: &'static str) -> Result<(), OperationError> {
    match ctx.request.principal {
        Principal::Anonymous => Ok(()),
        _ => Err(forbidden(ctx, operation)),
    }
}
