#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # HWGW Core
//!
//! Batched hack/grow/weaken scheduling core for sandboxed idle-game
//! automation.
//!
//! ## Overview
//!
//! The host game runtime dispatches many independent worker instances,
//! each performing exactly one operation against a simulated server. This
//! crate computes the timing offsets that make those independently
//! dispatched operations complete in a precise overlapping sequence,
//! keeping a target's security at its floor and money at its maximum
//! while maximizing extraction throughput.
//!
//! ## Architecture
//!
//! Coordination is entirely open-loop: all ordering decisions happen at
//! planning time, before dispatch. Once launched, an operation cannot be
//! cancelled, retried, or re-sequenced — correctness rests on the
//! precomputed delay offsets and a configured safety margin between
//! order-dependent completions.
//!
//! ## Module Organization
//!
//! - [`types`] - Target/player snapshots, operations, batches, records
//! - [`timing`] - Duration bundles and backward offset computation
//! - [`planner`] - Prep detection, thread sizing, capacity-paced cycles
//! - [`executor`] - Timed wait plus one runtime primitive invocation
//! - [`dispatch`] - Fire-and-forget worker launch with id tracking
//! - [`observer`] - Optional best-effort dispatch-record sink
//! - [`runtime`] - Trait seams to the host game runtime
//! - [`crawl`] - Breadth-first network traversal
//! - [`config`] - Tunable margins, fractions, and tolerances
//! - [`error`] - Structured error handling
//! - [`testing`] - Deterministic simulated runtime for tests and demos
//!
//! ## Quick Start
//!
//! ```rust
//! use hwgw_core::config::BatchConfig;
//! use hwgw_core::planner::BatchPlanner;
//! use hwgw_core::testing::sim_formulas;
//! use hwgw_core::types::{PlayerSnapshot, TargetSnapshot};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let planner = BatchPlanner::new(BatchConfig::default())?;
//! let target = TargetSnapshot {
//!     hostname: "phantasy".to_string(),
//!     security_level: 5.0,
//!     min_security_level: 5.0,
//!     money: 1_000_000.0,
//!     max_money: 1_000_000.0,
//! };
//! let player = PlayerSnapshot { hacking_level: 100, hacking_exp: 5000.0 };
//!
//! let batch = planner.plan_batch(&target, &player, &sim_formulas())?;
//! assert_eq!(batch.operations.len(), 4);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crawl;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod logging;
pub mod observer;
pub mod planner;
pub mod runtime;
pub mod testing;
pub mod timing;
pub mod types;

pub use config::BatchConfig;
pub use dispatch::{DispatchSink, WorkerScripts};
pub use error::{HwgwError, Result};
pub use executor::{ExecutionRequest, OperationExecutor};
pub use observer::{ObservationPublisher, OperationObserver};
pub use planner::{select_target, BatchPlanner, RepeatingPlanner};
pub use runtime::{GameRuntime, HackingFormulas, ProcessLauncher, RunOptions};
pub use timing::{compute_offsets, OperationDurations, PlannedSlot};
pub use types::{
    Batch, DispatchRecord, Operation, OperationKind, PlayerSnapshot, TargetSnapshot,
};
