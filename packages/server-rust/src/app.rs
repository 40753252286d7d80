//! Process wiring.
//!
//! Builds both authentication pipelines, the chain dispatcher, the
//! operation service and its domain services over the in-memory adapters.
//! The two pipelines get their own codec and resolver; they share only the
//! security event sink.

use std::sync::Arc;

use vigil_core::{AdminClaims, TenantClaims};

use crate::auth::{
    AdminPipeline, AdminResolver, AuthConfig, ChainDispatcher, PathPartition, SecurityEvents,
    TenantPipeline, TenantResolver, TokenCodec,
};
use crate::network::{NetworkConfig, NetworkModule};
use crate::service::domain::{AlertService, CaseService, UserService};
use crate::service::{OperationService, ServerConfig, TenantJobRunner};
use crate::storage::{CaseRepository, MemoryCaseStore, MemoryDirectory};
use crate::tenancy::TenantScopedDataGate;

/// A fully wired server over in-memory stores.
pub struct Vigil {
    /// Every platform registry. Seed it before serving.
    pub directory: Arc<MemoryDirectory>,
    pub dispatcher: Arc<ChainDispatcher>,
    pub operations: Arc<OperationService>,
    pub events: Arc<SecurityEvents>,
}

impl Vigil {
    /// Wires everything from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `auth` fails [`AuthConfig::validate`].
    pub fn in_memory(auth: &AuthConfig, server: ServerConfig) -> anyhow::Result<Self> {
        auth.validate()?;

        let directory = Arc::new(MemoryDirectory::new());
        let events = Arc::new(SecurityEvents::new(auth.failure_warn_threshold));

        let admin = AdminPipeline::new(
            TokenCodec::<AdminClaims>::new(auth.admin_secret.as_bytes(), auth.clock_skew_secs),
            AdminResolver::new(directory.clone(), directory.clone()),
            Arc::clone(&events),
        );
        let tenant = TenantPipeline::new(
            TokenCodec::<TenantClaims>::new(auth.tenant_secret.as_bytes(), auth.clock_skew_secs),
            TenantResolver::new(directory.clone(), directory.clone(), directory.clone()),
            Arc::clone(&events),
        );
        let dispatcher = Arc::new(ChainDispatcher::new(
            PathPartition::from_config(auth),
            admin,
            tenant,
        ));

        let store: Arc<dyn CaseRepository> = Arc::new(MemoryCaseStore::new());
        let gate = TenantScopedDataGate::new(store);
        let operations = Arc::new(OperationService::with_services(
            Arc::new(server),
            CaseService::new(gate.clone()),
            AlertService::new(gate),
            UserService::new(
                directory.clone(),
                directory.clone(),
                directory.clone(),
                directory.clone(),
            ),
        ));

        Ok(Self {
            directory,
            dispatcher,
            operations,
            events,
        })
    }

    /// HTTP server over this wiring.
    #[must_use]
    pub fn network(&self, config: NetworkConfig) -> NetworkModule {
        NetworkModule::new(
            config,
            Arc::clone(&self.operations),
            self.directory.clone(),
            Arc::clone(&self.dispatcher),
        )
    }

    /// Background runner for per-tenant jobs.
    #[must_use]
    pub fn tenant_jobs(&self) -> TenantJobRunner {
        TenantJobRunner::new(Arc::clone(&self.operations), self.directory.clone())
    }
}
