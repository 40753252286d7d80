//! Admission control for operations: a concurrency ceiling plus a per-call
//! deadline.
//!
//! An operation is admitted only if a permit is free right now; otherwise it
//! fails with `OperationError::Overloaded` without waiting. Admitted
//! operations run under their `ctx.call_timeout_ms` deadline. The permit
//! lives inside the returned future, so it is released when the operation
//! finishes, times out, or is dropped by a disconnecting client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::Semaphore;
use tower::{Layer, Service};
use tracing::warn;

use crate::service::operation::{Operation, OperationError, OperationResponse};

type BoxFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

/// Shares one permit pool across every clone of the pipeline.
#[derive(Debug, Clone)]
pub struct AdmissionLayer {
    permits: Arc<Semaphore>,
}

impl AdmissionLayer {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }

    /// Free permits.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = Admission<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Admission {
            inner,
            permits: Arc::clone(&self.permits),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Admission<S> {
    inner: S,
    permits: Arc<Semaphore>,
}

impl<S> Service<Operation> for Admission<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let operation = op.descriptor().name;
        let call_id = op.ctx().call_id;
        let deadline_ms = op.ctx().call_timeout_ms;

        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            warn!(operation, call_id, "operation shed: concurrency ceiling reached");
            return Box::pin(async { Err(OperationError::Overloaded) });
        };

        let admitted = self.inner.call(op);
        Box::pin(async move {
            let _permit = permit;
            tokio::time::timeout(Duration::from_millis(deadline_ms), admitted)
                .await
                .unwrap_or_else(|_| {
                    warn!(operation, call_id, deadline_ms, "operation deadline exceeded");
                    Err(OperationError::Timeout {
                        timeout_ms: deadline_ms,
                    })
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use tower::ServiceExt;
    use vigil_core::RequestContext;

    use super::*;
    use crate::service::operation::OperationContext;

    /// Answers after `delay_ms`.
    #[derive(Clone)]
    struct Sleeper {
        delay_ms: u64,
    }

    impl Service<Operation> for Sleeper {
        type Response = OperationResponse;
        type Error = OperationError;
        type Future = BoxFuture;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _op: Operation) -> Self::Future {
            let delay = Duration::from_millis(self.delay_ms);
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(OperationResponse::Empty)
            })
        }
    }

    fn op(deadline_ms: u64) -> Operation {
        Operation::ListCases {
            ctx: OperationContext::new(9, RequestContext::system("test"), deadline_ms),
        }
    }

    #[tokio::test]
    async fn admitted_operation_completes_and_returns_its_permit() {
        let layer = AdmissionLayer::new(2);
        let resp = layer
            .layer(Sleeper { delay_ms: 1 })
            .oneshot(op(1_000))
            .await
            .unwrap();
        assert!(matches!(resp, OperationResponse::Empty));
        assert_eq!(layer.available(), 2);
    }

    #[tokio::test]
    async fn saturated_pool_sheds_without_waiting() {
        let layer = AdmissionLayer::new(1);
        let busy = layer.layer(Sleeper { delay_ms: 10_000 });
        let holder = tokio::spawn(busy.oneshot(op(60_000)));
        while layer.available() > 0 {
            tokio::task::yield_now().await;
        }

        let err = layer
            .layer(Sleeper { delay_ms: 1 })
            .oneshot(op(1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Overloaded));

        holder.abort();
        let _ = holder.await;
        assert_eq!(layer.available(), 1);
    }

    #[tokio::test]
    async fn deadline_is_taken_from_the_operation_context() {
        let layer = AdmissionLayer::new(4);
        let err = layer
            .layer(Sleeper { delay_ms: 500 })
            .oneshot(op(20))
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Timeout { timeout_ms: 20 }));
        assert_eq!(layer.available(), 4);
    }
}
