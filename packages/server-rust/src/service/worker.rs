//! Background work.
//!
//! [`BackgroundWorker`] drives a [`BackgroundRunnable`] from one tokio task:
//! queued tasks arrive over a bounded channel and a timer calls `on_tick`.
//!
//! The worker task itself never holds a tenant context. Work that needs
//! tenant-scoped data is expressed as a [`TenantJob`] and executed through
//! [`TenantContextRunner::run_as`], one scope per job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};
use vigil_core::{CaseId, TenantDirectory, TenantId};

use super::executor::OperationService;
use super::operation::{Operation, OperationResponse};
use crate::tenancy::TenantContextRunner;

const QUEUE_DEPTH: usize = 256;

/// Handler driven by a [`BackgroundWorker`].
#[async_trait]
pub trait BackgroundRunnable: Send + 'static {
    type Task: Send + 'static;

    async fn run(&mut self, task: Self::Task);

    /// Periodic work; the first call happens one interval after start.
    async fn on_tick(&mut self) {}

    /// Last call before the worker task exits.
    async fn shutdown(&mut self) {}
}

/// Handle to a running worker task.
///
/// Queued tasks are handled one at a time, interleaved with ticks. `stop`
/// lets the task finish the task or tick in progress, then calls
/// [`BackgroundRunnable::shutdown`]; tasks still queued are dropped.
pub struct BackgroundWorker<R: BackgroundRunnable> {
    queue: Option<mpsc::Sender<R::Task>>,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl<R: BackgroundRunnable> BackgroundWorker<R> {
    /// Spawns the worker task. Must be called inside a tokio runtime.
    pub fn start(runnable: R, tick_interval_ms: u64) -> Self {
        let (queue, inbox) = mpsc::channel(QUEUE_DEPTH);
        let (stop, stopped) = watch::channel(false);
        let period = Duration::from_millis(tick_interval_ms.max(1));
        let task = tokio::spawn(drive(runnable, inbox, stopped, period));
        Self {
            queue: Some(queue),
            stop,
            task: Some(task),
        }
    }

    /// Queues `task`, waiting for room when the queue is full.
    ///
    /// # Errors
    ///
    /// Fails once the worker has been stopped.
    pub async fn submit(&self, task: R::Task) -> anyhow::Result<()> {
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("background worker is stopped"))?;
        queue
            .send(task)
            .await
            .map_err(|_| anyhow::anyhow!("background worker exited"))
    }

    /// Stops the worker and waits for its task to exit. Idempotent.
    pub async fn stop(&mut self) {
        let _ = self.stop.send(true);
        self.queue = None;
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!(error = %err, "background worker task failed");
            }
        }
    }
}

async fn drive<R: BackgroundRunnable>(
    mut runnable: R,
    mut inbox: mpsc::Receiver<R::Task>,
    mut stopped: watch::Receiver<bool>,
    period: Duration,
) {
    let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stopped.changed() => break,
            task = inbox.recv() => match task {
                Some(task) => runnable.run(task).await,
                None => break,
            },
            _ = ticks.tick() => runnable.on_tick().await,
        }
    }

    runnable.shutdown().await;
    debug!("background worker stopped");
}

// ---------------------------------------------------------------------------
// TenantJob
// ---------------------------------------------------------------------------

/// Work that must run inside one tenant's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantJob {
    /// Report cases of `tenant` still `New` past the staleness threshold.
    FindStaleCases { tenant: TenantId },
}

impl TenantJob {
    #[must_use]
    pub fn tenant(&self) -> TenantId {
        match self {
            Self::FindStaleCases { tenant } => *tenant,
        }
    }
}

/// Latest stale-case scan result per tenant.
pub type StaleCaseReports = Arc<DashMap<TenantId, Vec<CaseId>>>;

/// Runs [`TenantJob`]s, each in its own tenant scope. On every tick it
/// enumerates active tenants (a tenant-agnostic step), drops reports of
/// tenants no longer active, and runs a stale-case scan for each of them.
pub struct TenantJobRunner {
    operations: Arc<OperationService>,
    tenants: Arc<dyn TenantDirectory>,
    runner: TenantContextRunner,
    stale_after_secs: i64,
    reports: StaleCaseReports,
}

impl TenantJobRunner {
    #[must_use]
    pub fn new(operations: Arc<OperationService>, tenants: Arc<dyn TenantDirectory>) -> Self {
        let stale_after_secs = operations.config().stale_case_after_secs;
        Self {
            operations,
            tenants,
            runner: TenantContextRunner::new(),
            stale_after_secs,
            reports: Arc::new(DashMap::new()),
        }
    }

    /// Handle to the scan results; stays valid after the runner moves into
    /// a worker.
    #[must_use]
    pub fn reports(&self) -> StaleCaseReports {
        Arc::clone(&self.reports)
    }
}

#[async_trait]
impl BackgroundRunnable for TenantJobRunner {
    type Task = TenantJob;

    async fn run(&mut self, job: TenantJob) {
        let tenant = job.tenant();
        let operations = Arc::clone(&self.operations);
        let older_than_secs = self.stale_after_secs;

        let result = self
            .runner
            .run_as(tenant, || async move {
                let ctx = operations.system_context();
                operations
                    .execute(Operation::FindStaleCases {
                        ctx,
                        older_than_secs,
                    })
                    .await
            })
            .await;

        match result {
            Ok(OperationResponse::Cases(stale)) => {
                if !stale.is_empty() {
                    warn!(tenant = %tenant, count = stale.len(), "cases awaiting triage past threshold");
                }
                self.reports
                    .insert(tenant, stale.into_iter().map(|case| case.id).collect());
            }
            Ok(other) => error!(tenant = %tenant, response = ?other, "unexpected stale scan response"),
            Err(err) => error!(tenant = %tenant, error = %err, "stale case scan failed"),
        }
    }

    async fn on_tick(&mut self) {
        match self.tenants.list_active_tenants().await {
            Ok(tenants) => {
                self.reports.retain(|tenant, _| tenants.contains(tenant));
                for tenant in tenants {
                    self.run(TenantJob::FindStaleCases { tenant }).await;
                }
            }
            Err(err) => error!(error = %err, "could not enumerate tenants for stale case sweep"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
