//! Per-operation instrumentation.
//!
//! Every operation runs inside an `operation` span carrying its service,
//! name, principal kind and call id. On completion the span gets
//! `duration_ms` and `outcome`, and one `operation complete` event is
//! emitted. Guard and role refusals are counted as `denied`, separately
//! from failures, so probing shows up in the logs as its own class.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{field, info, info_span, Instrument, Span};

use crate::service::operation::{Operation, OperationError, OperationResponse};

/// Classifies a finished operation for logs.
#[must_use]
pub fn outcome(result: &Result<OperationResponse, OperationError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(
            OperationError::TenantContextMissing { .. }
            | OperationError::TenantScopeForbidden { .. }
            | OperationError::Forbidden { .. },
        ) => "denied",
        Err(OperationError::NotFound) => "not_found",
        Err(OperationError::Overloaded | OperationError::Timeout { .. }) => "shed",
        Err(_) => "error",
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = Metrics<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Metrics { inner }
    }
}

#[derive(Debug, Clone)]
pub struct Metrics<S> {
    inner: S,
}

impl<S> Service<Operation> for Metrics<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let descriptor = op.descriptor();
        let span = info_span!(
            "operation",
            service = descriptor.service_name,
            operation = descriptor.name,
            principal = op.ctx().request.principal.kind(),
            call_id = op.ctx().call_id,
            duration_ms = field::Empty,
            outcome = field::Empty,
        );

        let started = Instant::now();
        let fut = self.inner.call(op);
        Box::pin(
            async move {
                let result = fut.await;
                let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                let outcome = outcome(&result);

                let span = Span::current();
                span.record("duration_ms", duration_ms);
                span.record("outcome", outcome);
                info!(duration_ms, outcome, "operation complete");
                result
            }
            .instrument(span),
        )
    }
}
