//! Tenant user administration and activation.
//!
//! User accounts live in the platform registry, not in tenant-partitioned
//! storage, so admin operations here run without a tenant context.

use std::sync::Arc;

use tracing::info;
use vigil_core::{
    check_deletable, ActivationTokens, DeletionFacts, LifecycleError, MessageLedger,
    TenantDirectory, UserAccount, UserDirectory, UserStatus,
};

use super::require_admin;
use crate::service::operation::{Operation, OperationError, OperationResponse};

pub struct UserService {
    users: Arc<dyn UserDirectory>,
    tenants: Arc<dyn TenantDirectory>,
    activations: Arc<dyn ActivationTokens>,
    ledger: Arc<dyn MessageLedger>,
}

impl UserService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        tenants: Arc<dyn TenantDirectory>,
        activations: Arc<dyn ActivationTokens>,
        ledger: Arc<dyn MessageLedger>,
    ) -> Self {
        Self {
            users,
            tenants,
            activations,
            ledger,
        }
    }

    async fn account(&self, id: vigil_core::UserId) -> Result<UserAccount, OperationError> {
        self.users.find_user(id).await?.ok_or(OperationError::NotFound)
    }

    async fn handle(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        match op {
            Operation::ListUsers { ctx, tenant_id } => {
                require_admin(&ctx, "list_users")?;
                Ok(OperationResponse::Users(self.users.list_users(tenant_id).await?))
            }
            Operation::CreateUser {
                ctx,
                tenant_id,
                email,
                role,
            } => {
                let admin = require_admin(&ctx, "create_user")?;
                if self.tenants.find_tenant(tenant_id).await?.is_none() {
                    return Err(OperationError::NotFound);
                }
                if !role.is_staff() {
                    return Err(OperationError::InvalidInput(
                        "only staff roles can be created".to_string(),
                    ));
                }
                let email = email.trim().to_ascii_lowercase();
                if !valid_email(&email) {
                    return Err(OperationError::InvalidInput("invalid email".to_string()));
                }
                let taken = self
                    .users
                    .list_users(Some(tenant_id))
                    .await?
                    .iter()
                    .any(|u| u.email == email && u.status != UserStatus::Deleted);
                if taken {
                    return Err(OperationError::InvalidInput(
                        "email already registered".to_string(),
                    ));
                }

                let account =
                    UserAccount::pending(self.users.allocate_user_id().await?, tenant_id, email, role);
                self.users.save_user(&account).await?;
                info!(user = %account.id, tenant = %tenant_id, admin = %admin.id, "user created");
                Ok(OperationResponse::User(account))
            }
            Operation::SuspendUser { ctx, user_id } => {
                let admin = require_admin(&ctx, "suspend_user")?;
                let mut account = self.account(user_id).await?;
                account.transition(UserStatus::Suspended)?;
                self.users.save_user(&account).await?;
                info!(user = %user_id, admin = %admin.id, "user suspended");
                Ok(OperationResponse::User(account))
            }
            Operation::DeleteUser { ctx, user_id } => {
                let admin = require_admin(&ctx, "delete_user")?;
                let mut account = self.account(user_id).await?;
                let tenant = account.tenant_id;
                let managers = self.users.count_managers(tenant, UserStatus::Active).await?
                    + self.users.count_managers(tenant, UserStatus::Suspended).await?;
                let facts = DeletionFacts {
                    authored_messages: self.ledger.authored_count(user_id).await?,
                    managers,
                };
                check_deletable(&account, facts)?;
                account.transition(UserStatus::Deleted)?;
                self.users.save_user(&account).await?;
                info!(user = %user_id, admin = %admin.id, "user deleted");
                Ok(OperationResponse::User(account))
            }
            Operation::ActivateUser { ctx: _, token } => {
                let user_id = self
                    .activations
                    .consume(&token)
                    .await?
                    .ok_or(OperationError::NotFound)?;
                let mut account = self.account(user_id).await?;
                // Reset tokens must not double as a way out of suspension.
                if account.status != UserStatus::PendingActivation {
                    return Err(LifecycleError::IllegalTransition {
                        from: account.status.as_str(),
                        to: UserStatus::Active.as_str(),
                    }
                    .into());
                }
                account.transition(UserStatus::Active)?;
                self.users.save_user(&account).await?;
                info!(user = %user_id, "user activated");
                Ok(OperationResponse::User(account))
            }
            _ => Err(OperationError::WrongService),
        }
    }
}

domain_service!(UserService);

fn valid_email(email: &str) -> bool {
    email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.contains('@'))
}
