//! Prepare a target server: weaken to floor security, grow to max money.
//!
//! Usage: `prepare-server <target>`
//!
//! One positional argument, the target server name. Drives the simulated
//! runtime bundled with the library; a real deployment embeds the library
//! and supplies the host runtime instead.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use hwgw_core::config::BatchConfig;
use hwgw_core::executor::{ExecutionRequest, OperationExecutor};
use hwgw_core::logging::init_structured_logging;
use hwgw_core::observer::ObservationPublisher;
use hwgw_core::planner::RepeatingPlanner;
use hwgw_core::runtime::GameRuntime;
use hwgw_core::testing::{sim_network, SimFormulas, SimRuntime};

#[tokio::main]
async fn main() {
    init_structured_logging();

    let Some(target) = std::env::args().nth(1) else {
        eprintln!("usage: prepare-server <target>");
        std::process::exit(1);
    };

    // Short durations so prep cycles finish in seconds instead of minutes.
    let formulas = Arc::new(SimFormulas {
        hack_time_ms: 500,
        grow_time_ms: 2_000,
        weaken_time_ms: 2_500,
    });
    let runtime = Arc::new(SimRuntime::new(sim_network()));
    runtime.set_security(&target, 10.0);
    runtime.set_money(&target, 0.0);

    let config = BatchConfig::default();
    let planner = match RepeatingPlanner::new(
        runtime.clone(),
        formulas,
        config.clone(),
        target.clone(),
        "home",
    ) {
        Ok(planner) => planner,
        Err(e) => {
            error!(error = %e, "Failed to construct planner");
            std::process::exit(1);
        }
    };

    let observer = Arc::new(ObservationPublisher::new(config.observer_channel_capacity));
    let executor =
        OperationExecutor::new(runtime.clone(), config.clone()).with_observer(observer);

    loop {
        let snapshot = match runtime.target_snapshot(&target).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(target = %target, error = %e, "Failed to read target state");
                std::process::exit(1);
            }
        };
        if !snapshot.needs_prep() {
            info!(
                target = %target,
                security_level = snapshot.security_level,
                money = snapshot.money,
                "Target prepped"
            );
            break;
        }

        let batch = match planner.next_cycle().await {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                tokio::time::sleep(tokio::time::Duration::from_millis(config.cycle_pause_ms))
                    .await;
                continue;
            }
            Err(e) => {
                error!(target = %target, error = %e, "Planning failed");
                std::process::exit(1);
            }
        };

        info!(
            target = %target,
            operations = batch.operations.len(),
            total_threads = batch.total_threads(),
            "Dispatching prep batch"
        );

        // One lightweight task per operation, like the host runtime's
        // per-script execution contexts. No batch-wide abort: a failed
        // operation leaves the rest running.
        let mut workers = JoinSet::new();
        for operation in &batch.operations {
            let executor = executor.clone();
            let request = ExecutionRequest::from(operation);
            workers.spawn(async move { executor.execute(request).await });
        }
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(record)) => info!(
                    record = %record.to_json(),
                    "Operation landed"
                ),
                Ok(Err(e)) => error!(error = %e, "Operation failed"),
                Err(e) => error!(error = %e, "Worker task panicked"),
            }
        }
    }
}
