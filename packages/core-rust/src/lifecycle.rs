//! Tenant user lifecycle.
//!
//! State machine: `PendingActivation -> Active -> Suspended | Deleted`, with
//! `Suspended -> Active` for reinstatement. `Deleted` is terminal and is a
//! soft delete: the account row stays, the status changes.

use serde::{Deserialize, Serialize};

use crate::types::{TenantId, TenantRole, UserId};

/// Lifecycle state of a tenant user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Created, no usable credential yet.
    PendingActivation,
    Active,
    Suspended,
    /// Soft-deleted. Terminal.
    Deleted,
}

impl UserStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingActivation => "pending_activation",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Deleted => "deleted",
        }
    }

    /// Whether an account in this state still holds its role. Suspension
    /// keeps the role; only activation grants it and deletion ends it.
    #[must_use]
    pub fn holds_role(self) -> bool {
        matches!(self, Self::Active | Self::Suspended)
    }

    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: UserStatus) -> bool {
        matches!(
            (self, next),
            (Self::PendingActivation | Self::Suspended, Self::Active)
                | (Self::Active, Self::Suspended | Self::Deleted)
                | (Self::Suspended, Self::Deleted)
        )
    }
}

/// Lifecycle rule violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("user {user_id} authored {count} messages and cannot be deleted")]
    HasAuthoredMessages { user_id: UserId, count: u64 },
    #[error("user {user_id} is the only manager of its tenant")]
    SoleManager { user_id: UserId },
}

/// A tenant user as the directory stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub email: String,
    pub role: TenantRole,
    pub status: UserStatus,
}

impl UserAccount {
    /// New accounts always start in `PendingActivation`.
    #[must_use]
    pub fn pending(id: UserId, tenant_id: TenantId, email: String, role: TenantRole) -> Self {
        Self {
            id,
            tenant_id,
            email,
            role,
            status: UserStatus::PendingActivation,
        }
    }

    /// Moves the account to `next`, or reports why it cannot.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::IllegalTransition`] for transitions outside
    /// the state machine.
    pub fn transition(&mut self, next: UserStatus) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(next) {
            return Err(LifecycleError::IllegalTransition {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Facts about a user's dependents, gathered before a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionFacts {
    /// Messages this user authored in any case.
    pub authored_messages: u64,
    /// Managers in the user's tenant that still hold the role (active or
    /// suspended), including the user.
    pub managers: u64,
}

/// Referential check run before any delete. Nothing is mutated on failure.
///
/// # Errors
///
/// Returns [`LifecycleError::HasAuthoredMessages`] when the user owns
/// messages, [`LifecycleError::SoleManager`] when removing the user would
/// leave the tenant without a manager, and
/// [`LifecycleError::IllegalTransition`] when the account cannot be deleted
/// from its current state.
pub fn check_deletable(account: &UserAccount, facts: DeletionFacts) -> Result<(), LifecycleError> {
    if !account.status.can_transition_to(UserStatus::Deleted) {
        return Err(LifecycleError::IllegalTransition {
            from: account.status.as_str(),
            to: UserStatus::Deleted.as_str(),
        });
    }
    if facts.authored_messages > 0 {
        return Err(LifecycleError::HasAuthoredMessages {
            user_id: account.id,
            count: facts.authored_messages,
        });
    }
    if account.role == TenantRole::Manager
        && account.status.holds_role()
        && facts.managers <= 1
    {
        return Err(LifecycleError::SoleManager {
            user_id: account.id,
        });
    }
    Ok(())
}
