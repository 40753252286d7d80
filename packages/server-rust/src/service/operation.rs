//! Typed operations, their static descriptors, and pipeline errors.

use uuid::Uuid;
use vigil_core::{
    CaseId, CaseStatus, LifecycleError, RequestContext, TenantId, TenantRole, UserAccount,
    UserId,
};

use crate::storage::CaseRecord;
use crate::tenancy::{DataGateError, TenantContextError};

/// Service names used for routing.
pub mod service_names {
    pub const CASES: &str = "cases";
    pub const ALERTS: &str = "alerts";
    pub const USERS: &str = "users";
}

/// Whether an operation needs, forbids, or ignores the tenant context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantRequirement {
    /// Touches tenant-partitioned data; a tenant context must be active.
    Required,
    /// Platform-level; must never run while a tenant context is active.
    Forbidden,
    /// Works the same with or without a tenant context.
    Agnostic,
}

/// Static registration data of one operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub service_name: &'static str,
    pub tenant: TenantRequirement,
}

impl OperationDescriptor {
    const fn new(name: &'static str, service_name: &'static str, tenant: TenantRequirement) -> Self {
        Self {
            name,
            service_name,
            tenant,
        }
    }
}

/// Context carried with every operation through the pipeline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub call_id: u64,
    pub request: RequestContext,
    pub call_timeout_ms: u64,
}

impl OperationContext {
    #[must_use]
    pub fn new(call_id: u64, request: RequestContext, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            request,
            call_timeout_ms,
        }
    }
}

/// Typed operation variants dispatched through the pipeline.
#[derive(Debug)]
pub enum Operation {
    ListCases {
        ctx: OperationContext,
    },
    GetCase {
        ctx: OperationContext,
        case_id: CaseId,
    },
    UpdateCaseStatus {
        ctx: OperationContext,
        case_id: CaseId,
        status: CaseStatus,
    },
    /// Cases still `New` and untouched for longer than `older_than_secs`.
    FindStaleCases {
        ctx: OperationContext,
        older_than_secs: i64,
    },
    SubmitAlert {
        ctx: OperationContext,
        title: String,
        body: String,
    },
    AlertStatus {
        ctx: OperationContext,
        tracking_id: Uuid,
    },
    ListUsers {
        ctx: OperationContext,
        tenant_id: Option<TenantId>,
    },
    CreateUser {
        ctx: OperationContext,
        tenant_id: TenantId,
        email: String,
        role: TenantRole,
    },
    SuspendUser {
        ctx: OperationContext,
        user_id: UserId,
    },
    DeleteUser {
        ctx: OperationContext,
        user_id: UserId,
    },
    ActivateUser {
        ctx: OperationContext,
        token: String,
    },
}

impl Operation {
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Self::ListCases { ctx }
            | Self::GetCase { ctx, .. }
            | Self::UpdateCaseStatus { ctx, .. }
            | Self::FindStaleCases { ctx, .. }
            | Self::SubmitAlert { ctx, .. }
            | Self::AlertStatus { ctx, .. }
            | Self::ListUsers { ctx, .. }
            | Self::CreateUser { ctx, .. }
            | Self::SuspendUser { ctx, .. }
            | Self::DeleteUser { ctx, .. }
            | Self::ActivateUser { ctx, .. } => ctx,
        }
    }

    /// The operation's registration: name, owning service, tenant requirement.
    #[must_use]
    pub fn descriptor(&self) -> OperationDescriptor {
        use service_names::{ALERTS, CASES, USERS};
        use TenantRequirement::{Agnostic, Forbidden, Required};

        match self {
            Self::ListCases { .. } => OperationDescriptor::new("list_cases", CASES, Required),
            Self::GetCase { .. } => OperationDescriptor::new("get_case", CASES, Required),
            Self::UpdateCaseStatus { .. } => {
                OperationDescriptor::new("update_case_status", CASES, Required)
            }
            Self::FindStaleCases { .. } => {
                OperationDescriptor::new("find_stale_cases", CASES, Required)
            }
            Self::SubmitAlert { .. } => OperationDescriptor::new("submit_alert", ALERTS, Required),
            Self::AlertStatus { .. } => OperationDescriptor::new("alert_status", ALERTS, Required),
            Self::ListUsers { .. } => OperationDescriptor::new("list_users", USERS, Forbidden),
            Self::CreateUser { .. } => OperationDescriptor::new("create_user", USERS, Forbidden),
            Self::SuspendUser { .. } => OperationDescriptor::new("suspend_user", USERS, Forbidden),
            Self::DeleteUser { .. } => OperationDescriptor::new("delete_user", USERS, Forbidden),
            Self::ActivateUser { .. } => OperationDescriptor::new("activate_user", USERS, Agnostic),
        }
    }
}

/// Successful response from an operation handler.
#[derive(Debug)]
pub enum OperationResponse {
    Cases(Vec<CaseRecord>),
    Case(CaseRecord),
    AlertReceipt { tracking_id: Uuid },
    AlertStatus { status: CaseStatus },
    Users(Vec<UserAccount>),
    User(UserAccount),
    Empty,
}

/// Errors returned by operation handlers and middleware.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unknown service: {name}")]
    UnknownService { name: String },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("wrong service for operation")]
    WrongService,
    /// A tenant-scoped operation reached the pipeline without a tenant.
    #[error("{operation} requires a tenant context")]
    TenantContextMissing { operation: &'static str },
    /// A platform operation reached the pipeline under a tenant scope.
    #[error("{operation} must not run under a tenant context")]
    TenantScopeForbidden { operation: &'static str },
    /// The principal may not perform this operation.
    #[error("{operation} not permitted for {principal} principal")]
    Forbidden {
        operation: &'static str,
        principal: &'static str,
    },
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Conflict(#[from] LifecycleError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TenantContextError> for OperationError {
    fn from(err: TenantContextError) -> Self {
        match err {
            TenantContextError::Missing => Self::TenantContextMissing {
                operation: "unit_of_work",
            },
            other => Self::Internal(other.into()),
        }
    }
}

impl From<DataGateError> for OperationError {
    fn from(err: DataGateError) -> Self {
        match err {
            DataGateError::TenantContextMissing { operation } => {
                Self::TenantContextMissing { operation }
            }
            DataGateError::Context(err) => err.into(),
            other => Self::Internal(other.into()),
        }
    }
}
