use async_trait::async_trait;

use crate::types::ExecutionReport;

/// Callback-style receiver for asynchronous fills (spec §4.1
/// `subscribe_executions(sink)`). The adapter owns delivery ordering: a
/// single sink instance must observe reports for a given `broker_order_id`
/// in the order the venue reported them (spec §5).
#[async_trait]
pub trait ExecutionSink: Send + Sync {
    async fn on_execution(&self, report: ExecutionReport);
}

/// An `ExecutionSink` built from an async closure, for adapters and tests
/// that don't want to define a dedicated type.
pub struct FnSink<F>(pub F);

#[async_trait]
impl<F> ExecutionSink for FnSink<F>
where
    F: Fn(ExecutionReport) + Send + Sync,
{
    async fn on_execution(&self, report: ExecutionReport) {
        (self.0)(report)
    }
}
