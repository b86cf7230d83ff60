//! External Runtime Abstraction
//!
//! This module provides the trait seams between the batching core and the
//! host game runtime ("NS"). The core consumes operation primitives, state
//! queries, duration/effect formulas, and a process-launch primitive through
//! these traits without knowing anything about the sandbox behind them.
//!
//! The formulas are deliberately opaque: the core never reimplements them,
//! it only consumes their outputs at planning time.

use async_trait::async_trait;

use crate::types::{PlayerSnapshot, TargetSnapshot};

/// Error type surfaced by runtime implementations
///
/// Propagated unchanged through the core; no local recovery or retry.
pub type RuntimeError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for runtime-facing calls
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

/// Options forwarded to an operation primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Thread count the primitive should run with
    pub threads: u32,

    /// Extra suspension the primitive itself applies before acting, in ms
    ///
    /// The executor performs its own timed wait, so this is normally zero;
    /// hosts that embed worker scripts directly may pass the planned delay
    /// through here instead.
    pub additional_delay_ms: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            additional_delay_ms: 0,
        }
    }
}

/// The host game runtime the core schedules operations against
///
/// One implementation exists per sandbox context. All target mutation
/// happens behind these calls; the core only observes the results through
/// fresh [`TargetSnapshot`] reads.
#[async_trait]
pub trait GameRuntime: Send + Sync {
    /// Lower the target's security; resolves when the simulated effect lands
    async fn weaken(&self, target: &str, opts: RunOptions) -> RuntimeResult<f64>;

    /// Raise the target's money toward its ceiling
    async fn grow(&self, target: &str, opts: RunOptions) -> RuntimeResult<f64>;

    /// Extract money from the target
    async fn hack(&self, target: &str, opts: RunOptions) -> RuntimeResult<f64>;

    /// Read the target's current attributes
    async fn target_snapshot(&self, hostname: &str) -> RuntimeResult<TargetSnapshot>;

    /// Read the player's current skill state
    async fn player_snapshot(&self) -> RuntimeResult<PlayerSnapshot>;

    /// Free RAM on a dispatching host, in GB
    async fn free_ram_gb(&self, host: &str) -> RuntimeResult<f64>;

    /// Hosts adjacent to `hostname` in the simulated network
    fn scan(&self, hostname: &str) -> Vec<String>;

    /// Diagnostic print channel surfaced to the player
    fn print(&self, message: &str);
}

/// Duration and effect formulas supplied by the runtime's formula collaborator
///
/// Deterministic functions of target attributes and player skill at the
/// moment of the call. Planning correctness depends only on these being
/// self-consistent, not on any particular curve.
pub trait HackingFormulas: Send + Sync {
    /// Wall-clock duration of one hack against the target, in ms
    fn hack_time_ms(&self, target: &TargetSnapshot, player: &PlayerSnapshot) -> u64;

    /// Wall-clock duration of one grow against the target, in ms
    fn grow_time_ms(&self, target: &TargetSnapshot, player: &PlayerSnapshot) -> u64;

    /// Wall-clock duration of one weaken against the target, in ms
    fn weaken_time_ms(&self, target: &TargetSnapshot, player: &PlayerSnapshot) -> u64;

    /// Fraction of the target's max money one hack thread removes
    fn hack_percent(&self, target: &TargetSnapshot, player: &PlayerSnapshot) -> f64;

    /// Grow threads needed to move the target's money from `from_money`
    /// to `to_money`
    fn growth_threads(
        &self,
        target: &TargetSnapshot,
        player: &PlayerSnapshot,
        from_money: f64,
        to_money: f64,
    ) -> u32;

    /// Security increase caused by a hack with `threads` threads
    fn hack_security_rise(&self, threads: u32) -> f64;

    /// Security increase caused by a grow with `threads` threads
    fn grow_security_rise(&self, threads: u32) -> f64;

    /// Security decrease achieved by a weaken with `threads` threads
    fn weaken_security_drop(&self, threads: u32) -> f64;
}

/// Process-launch primitive for fire-and-forget worker dispatch
///
/// Launches a named script on a named host with positional arguments.
/// Resolves once the launch is accepted, never waits for the worker to
/// finish its operation.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Launch `script` on `host` with `threads` threads and positional args
    ///
    /// Returns the runtime's process id for the launched worker.
    async fn launch(
        &self,
        script: &str,
        host: &str,
        threads: u32,
        args: &[String],
    ) -> RuntimeResult<u64>;
}
