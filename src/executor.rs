//! Operation Executor
//!
//! Runs exactly one weaken/grow/hack against a target: suspend for the
//! planned delay, invoke the runtime primitive, and report actual start
//! and end timestamps to an optional observer. One executor call maps to
//! one dispatched worker script instance in the host runtime.
//!
//! Coordination is open-loop: once a batch is dispatched nothing here can
//! cancel, retry, or re-sequence an operation. Prediction drift is
//! expected and tolerated — the hack variant warns through the runtime's
//! print channel when security has drifted past the configured tolerance,
//! then executes anyway.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::BatchConfig;
use crate::error::{HwgwError, Result};
use crate::observer::OperationObserver;
use crate::runtime::{GameRuntime, RunOptions};
use crate::types::{DispatchRecord, Operation, OperationKind};

/// Request for a single operation execution
///
/// Mirrors the positional arguments a dispatched worker script receives:
/// target, delay, operation id, plus the thread count the launcher used.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    /// Operation to perform
    pub kind: OperationKind,

    /// Target server hostname
    pub target: String,

    /// Milliseconds to wait before invoking the primitive
    pub delay_ms: u64,

    /// Correlates the emitted record with the planned operation
    pub operation_id: Uuid,

    /// Thread count forwarded to the runtime primitive
    pub threads: u32,
}

impl From<&Operation> for ExecutionRequest {
    fn from(op: &Operation) -> Self {
        Self {
            kind: op.kind,
            target: op.target.clone(),
            delay_ms: op.planned_delay_ms,
            operation_id: op.operation_id,
            threads: op.threads,
        }
    }
}

/// Executes single operations against the external runtime
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use hwgw_core::config::BatchConfig;
/// use hwgw_core::executor::{ExecutionRequest, OperationExecutor};
/// use hwgw_core::testing::{sim_network, SimRuntime};
/// use hwgw_core::types::OperationKind;
/// use uuid::Uuid;
///
/// let runtime = Arc::new(SimRuntime::new(sim_network()));
/// let executor = OperationExecutor::new(runtime, BatchConfig::default());
///
/// let record = tokio_test::block_on(executor.execute(ExecutionRequest {
///     kind: OperationKind::Weaken,
///     target: "n00dles".to_string(),
///     delay_ms: 0,
///     operation_id: Uuid::new_v4(),
///     threads: 1,
/// }))
/// .unwrap();
/// assert_eq!(record.kind, OperationKind::Weaken);
/// ```
#[derive(Clone)]
pub struct OperationExecutor {
    runtime: Arc<dyn GameRuntime>,
    observer: Option<Arc<dyn OperationObserver>>,
    config: BatchConfig,
}

impl OperationExecutor {
    /// Create an executor with no observer attached
    pub fn new(runtime: Arc<dyn GameRuntime>, config: BatchConfig) -> Self {
        Self {
            runtime,
            observer: None,
            config,
        }
    }

    /// Attach an optional observer for dispatch records
    ///
    /// Absence of an observer is a valid configuration; operations succeed
    /// identically whether or not anything observes them.
    pub fn with_observer(mut self, observer: Arc<dyn OperationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Execute one operation: timed wait, primitive call, record emission
    ///
    /// # Errors
    ///
    /// Runtime primitive failures propagate unchanged inside
    /// [`HwgwError::Runtime`]; there is no retry.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<DispatchRecord> {
        if request.delay_ms > 0 {
            sleep(Duration::from_millis(request.delay_ms)).await;
        }

        if request.kind == OperationKind::Hack {
            self.warn_on_security_drift(&request.target).await;
        }

        let opts = RunOptions {
            threads: request.threads,
            additional_delay_ms: 0,
        };

        let actual_start = Utc::now();
        let outcome = match request.kind {
            OperationKind::Hack => self.runtime.hack(&request.target, opts).await,
            OperationKind::Grow => self.runtime.grow(&request.target, opts).await,
            OperationKind::Weaken => self.runtime.weaken(&request.target, opts).await,
        };
        let actual_end = Utc::now();

        let effect = outcome.map_err(|source| HwgwError::Runtime {
            operation: request.kind,
            target: request.target.clone(),
            source,
        })?;

        let record = DispatchRecord {
            kind: request.kind,
            actual_start,
            actual_end,
            operation_id: request.operation_id,
        };

        debug!(
            kind = request.kind.tag(),
            target = %request.target,
            operation_id = %request.operation_id,
            duration_ms = (actual_end - actual_start).num_milliseconds(),
            effect = effect,
            "Operation completed"
        );

        // Best-effort: a missing or failing observer never affects outcome.
        if let Some(observer) = &self.observer {
            observer.record(&record);
        }

        Ok(record)
    }

    /// Warn when security has drifted past tolerance since planning
    ///
    /// Drift is tolerated, not fatal: the hack still runs. A failed state
    /// read here is also swallowed, since the primitive call that follows
    /// will surface any real runtime problem.
    async fn warn_on_security_drift(&self, target: &str) {
        let snapshot = match self.runtime.target_snapshot(target).await {
            Ok(snapshot) => snapshot,
            Err(_) => return,
        };

        let drift = snapshot.security_level - snapshot.min_security_level;
        if drift > self.config.security_tolerance {
            let message = format!(
                "WARN: hacking {} at security {:.2} ({:.2} above floor, tolerance {:.2})",
                target, snapshot.security_level, drift, self.config.security_tolerance
            );
            self.runtime.print(&message);
            warn!(
                target = %target,
                security_level = snapshot.security_level,
                drift = drift,
                tolerance = self.config.security_tolerance,
                "Security drifted above tolerance before hack"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ObservationPublisher;
    use crate::testing::{sim_network, SimRuntime};

    fn request(kind: OperationKind, delay_ms: u64) -> ExecutionRequest {
        ExecutionRequest {
            kind,
            target: "n00dles".to_string(),
            delay_ms,
            operation_id: Uuid::new_v4(),
            threads: 1,
        }
    }

    #[tokio::test]
    async fn test_weaken_executes_and_reports_timestamps() {
        let runtime = Arc::new(SimRuntime::new(sim_network()));
        let executor = OperationExecutor::new(runtime, BatchConfig::default());
        let record = executor
            .execute(request(OperationKind::Weaken, 0))
            .await
            .unwrap();
        assert_eq!(record.kind, OperationKind::Weaken);
        assert!(record.actual_end >= record.actual_start);
    }

    #[tokio::test]
    async fn test_missing_observer_is_tolerated() {
        let runtime = Arc::new(SimRuntime::new(sim_network()));
        let executor = OperationExecutor::new(runtime, BatchConfig::default());
        // No observer attached; operation must still succeed.
        let record = executor
            .execute(request(OperationKind::Grow, 0))
            .await
            .unwrap();
        assert_eq!(record.kind, OperationKind::Grow);
    }

    #[tokio::test]
    async fn test_observer_receives_record() {
        let runtime = Arc::new(SimRuntime::new(sim_network()));
        let publisher = Arc::new(ObservationPublisher::new(16));
        let mut subscription = publisher.subscribe();
        let executor = OperationExecutor::new(runtime, BatchConfig::default())
            .with_observer(publisher);

        let record = executor
            .execute(request(OperationKind::Weaken, 0))
            .await
            .unwrap();
        let observed = subscription.recv().await.unwrap();
        assert_eq!(observed, record);
    }

    #[tokio::test]
    async fn test_hack_warns_on_drifted_security() {
        let runtime = Arc::new(SimRuntime::new(sim_network()));
        runtime.set_security("n00dles", 10.0);
        let executor = OperationExecutor::new(runtime.clone(), BatchConfig::default());

        executor
            .execute(request(OperationKind::Hack, 0))
            .await
            .unwrap();

        let printed = runtime.printed();
        assert_eq!(printed.len(), 1);
        assert!(printed[0].contains("n00dles"));
        assert!(printed[0].contains("WARN"));
    }

    #[tokio::test]
    async fn test_hack_at_floor_does_not_warn() {
        let runtime = Arc::new(SimRuntime::new(sim_network()));
        let executor = OperationExecutor::new(runtime.clone(), BatchConfig::default());
        executor
            .execute(request(OperationKind::Hack, 0))
            .await
            .unwrap();
        assert!(runtime.printed().is_empty());
    }

    #[tokio::test]
    async fn test_runtime_failure_propagates() {
        let runtime = Arc::new(SimRuntime::new(sim_network()));
        runtime.fail_next_operation("induced outage");
        let executor = OperationExecutor::new(runtime, BatchConfig::default());
        let err = executor
            .execute(request(OperationKind::Weaken, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, HwgwError::Runtime { .. }));
        assert!(err.to_string().contains("induced outage"));
    }
}
