//! Dispatch Sink
//!
//! Hands planned operations to the host's process-launch primitive and
//! tracks outstanding operation ids for observability and debugging.
//! Dispatch is fire-and-forget: the launch call resolves when the worker
//! process is accepted, never when its operation completes. Completion is
//! observed asynchronously through dispatch records and fed back via
//! [`DispatchSink::mark_complete`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{HwgwError, Result};
use crate::runtime::ProcessLauncher;
use crate::types::{Batch, Operation, OperationKind};

/// Worker script names passed to the launch primitive, one per kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerScripts {
    /// Script launched for hack operations
    pub hack: String,
    /// Script launched for grow operations
    pub grow: String,
    /// Script launched for weaken operations
    pub weaken: String,
}

impl Default for WorkerScripts {
    fn default() -> Self {
        Self {
            hack: "hack.js".to_string(),
            grow: "grow.js".to_string(),
            weaken: "weaken.js".to_string(),
        }
    }
}

impl WorkerScripts {
    /// Script name for one operation kind
    pub fn for_kind(&self, kind: OperationKind) -> &str {
        match kind {
            OperationKind::Hack => &self.hack,
            OperationKind::Grow => &self.grow,
            OperationKind::Weaken => &self.weaken,
        }
    }
}

/// An operation handed to the launcher whose completion has not been observed
#[derive(Debug, Clone, PartialEq)]
pub struct OutstandingOperation {
    /// Operation kind
    pub kind: OperationKind,
    /// Target the worker runs against
    pub target: String,
    /// Host the worker was launched on
    pub host: String,
    /// Thread count the worker was launched with
    pub threads: u32,
    /// When the launch was accepted
    pub dispatched_at: DateTime<Utc>,
    /// Process id the launcher returned
    pub pid: u64,
}

/// Fire-and-forget dispatcher with outstanding-id tracking
#[derive(Clone)]
pub struct DispatchSink {
    launcher: Arc<dyn ProcessLauncher>,
    scripts: WorkerScripts,
    outstanding: Arc<RwLock<HashMap<Uuid, OutstandingOperation>>>,
}

impl DispatchSink {
    /// Create a sink over the host's launch primitive with default scripts
    pub fn new(launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self::with_scripts(launcher, WorkerScripts::default())
    }

    /// Create a sink with custom worker script names
    pub fn with_scripts(launcher: Arc<dyn ProcessLauncher>, scripts: WorkerScripts) -> Self {
        Self {
            launcher,
            scripts,
            outstanding: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Launch one operation's worker on `host`
    ///
    /// Positional arguments follow the worker contract: target, delay,
    /// operation id. Resolves on launch acceptance, not completion.
    ///
    /// # Errors
    ///
    /// Returns [`HwgwError::Dispatch`] when the launcher rejects the
    /// launch; already-launched operations of the same batch are not
    /// recalled (there is no batch-wide abort).
    pub async fn dispatch(&self, operation: &Operation, host: &str) -> Result<()> {
        let script = self.scripts.for_kind(operation.kind);
        let args = vec![
            operation.target.clone(),
            operation.planned_delay_ms.to_string(),
            operation.operation_id.to_string(),
        ];

        let pid = self
            .launcher
            .launch(script, host, operation.threads, &args)
            .await
            .map_err(|e| HwgwError::Dispatch {
                operation: operation.kind,
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let entry = OutstandingOperation {
            kind: operation.kind,
            target: operation.target.clone(),
            host: host.to_string(),
            threads: operation.threads,
            dispatched_at: Utc::now(),
            pid,
        };
        self.outstanding
            .write()
            .await
            .insert(operation.operation_id, entry);

        debug!(
            kind = operation.kind.tag(),
            target = %operation.target,
            host = %host,
            operation_id = %operation.operation_id,
            delay_ms = operation.planned_delay_ms,
            threads = operation.threads,
            pid = pid,
            "Operation dispatched"
        );

        Ok(())
    }

    /// Launch every operation of a batch on `host`, in plan order
    ///
    /// # Errors
    ///
    /// Stops at the first launch failure; operations already launched run
    /// to completion or fail independently.
    pub async fn dispatch_batch(&self, batch: &Batch, host: &str) -> Result<()> {
        for operation in &batch.operations {
            self.dispatch(operation, host).await?;
        }
        debug!(
            target = %batch.target,
            operations = batch.operations.len(),
            total_threads = batch.total_threads(),
            "Batch dispatched"
        );
        Ok(())
    }

    /// Clear an operation whose completion was observed
    ///
    /// Returns false when the id is unknown, which happens when a record
    /// arrives for an operation dispatched by someone else.
    pub async fn mark_complete(&self, operation_id: Uuid) -> bool {
        let removed = self.outstanding.write().await.remove(&operation_id);
        if removed.is_none() {
            warn!(
                operation_id = %operation_id,
                "Completion observed for unknown operation id"
            );
        }
        removed.is_some()
    }

    /// Number of dispatched operations with no observed completion
    pub async fn outstanding_count(&self) -> usize {
        self.outstanding.read().await.len()
    }

    /// Snapshot of all outstanding operations, for debugging
    pub async fn outstanding(&self) -> Vec<(Uuid, OutstandingOperation)> {
        self.outstanding
            .read()
            .await
            .iter()
            .map(|(id, op)| (*id, op.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SimLauncher;

    fn operation(kind: OperationKind, delay_ms: u64) -> Operation {
        Operation {
            kind,
            target: "n00dles".to_string(),
            planned_delay_ms: delay_ms,
            operation_id: Uuid::new_v4(),
            expected_duration_ms: 50_000,
            threads: 4,
        }
    }

    #[tokio::test]
    async fn test_dispatch_passes_positional_args() {
        let launcher = Arc::new(SimLauncher::default());
        let sink = DispatchSink::new(launcher.clone());
        let op = operation(OperationKind::Weaken, 40);

        sink.dispatch(&op, "home").await.unwrap();

        let launches = launcher.launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].script, "weaken.js");
        assert_eq!(launches[0].host, "home");
        assert_eq!(launches[0].threads, 4);
        assert_eq!(
            launches[0].args,
            vec![
                "n00dles".to_string(),
                "40".to_string(),
                op.operation_id.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_outstanding_tracking_lifecycle() {
        let launcher = Arc::new(SimLauncher::default());
        let sink = DispatchSink::new(launcher);
        let op = operation(OperationKind::Grow, 0);

        assert_eq!(sink.outstanding_count().await, 0);
        sink.dispatch(&op, "home").await.unwrap();
        assert_eq!(sink.outstanding_count().await, 1);

        assert!(sink.mark_complete(op.operation_id).await);
        assert_eq!(sink.outstanding_count().await, 0);

        // Second completion for the same id is unknown.
        assert!(!sink.mark_complete(op.operation_id).await);
    }

    #[tokio::test]
    async fn test_launch_failure_surfaces_as_dispatch_error() {
        let launcher = Arc::new(SimLauncher::default());
        launcher.fail_next_launch("host out of RAM");
        let sink = DispatchSink::new(launcher);
        let err = sink
            .dispatch(&operation(OperationKind::Hack, 0), "home")
            .await
            .unwrap_err();
        assert!(matches!(err, HwgwError::Dispatch { .. }));
        assert!(err.to_string().contains("host out of RAM"));
    }

    #[tokio::test]
    async fn test_custom_scripts_used_per_kind() {
        let launcher = Arc::new(SimLauncher::default());
        let scripts = WorkerScripts {
            hack: "workers/h.js".to_string(),
            grow: "workers/g.js".to_string(),
            weaken: "workers/w.js".to_string(),
        };
        let sink = DispatchSink::with_scripts(launcher.clone(), scripts);

        sink.dispatch(&operation(OperationKind::Hack, 0), "home")
            .await
            .unwrap();
        assert_eq!(launcher.launches()[0].script, "workers/h.js");
    }
}
