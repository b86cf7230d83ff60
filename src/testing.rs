//! # Test Utilities
//!
//! Deterministic in-process implementations of the runtime trait seams,
//! shared by unit tests, integration scenarios, and the demo binary. The
//! simulated effect model is linear and exactly invertible so planner
//! sizing can be checked end to end: a grow sized by [`SimFormulas`]
//! restores precisely the money a hack sized by the same formulas removed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::runtime::{
    GameRuntime, HackingFormulas, ProcessLauncher, RunOptions, RuntimeResult,
};
use crate::types::{PlayerSnapshot, TargetSnapshot};

/// Security removed per weaken thread
pub const WEAKEN_DROP_PER_THREAD: f64 = 0.05;
/// Security added per hack thread
pub const HACK_RISE_PER_THREAD: f64 = 0.002;
/// Security added per grow thread
pub const GROW_RISE_PER_THREAD: f64 = 0.004;
/// Fraction of max money removed per hack thread
pub const HACK_PERCENT_PER_THREAD: f64 = 0.01;
/// Fraction of max money restored per grow thread
pub const GROW_FRACTION_PER_THREAD: f64 = 0.02;

#[derive(Debug, Clone)]
struct SimTarget {
    security_level: f64,
    min_security_level: f64,
    money: f64,
    max_money: f64,
}

impl Default for SimTarget {
    fn default() -> Self {
        Self {
            security_level: 5.0,
            min_security_level: 5.0,
            money: 1_000_000.0,
            max_money: 1_000_000.0,
        }
    }
}

/// Small fixed network used across tests: home links to two targets, one
/// of which links one hop further out
pub fn sim_network() -> Vec<(String, Vec<String>)> {
    vec![
        (
            "home".to_string(),
            vec!["n00dles".to_string(), "joesguns".to_string()],
        ),
        (
            "n00dles".to_string(),
            vec!["home".to_string(), "phantasy".to_string()],
        ),
        ("joesguns".to_string(), vec!["home".to_string()]),
        ("phantasy".to_string(), vec!["n00dles".to_string()]),
    ]
}

/// Deterministic in-process game runtime
///
/// Every host in the supplied network starts fully prepped (security at
/// floor 5.0, money at a 1e6 ceiling); tests perturb state through
/// [`set_security`](Self::set_security) and [`set_money`](Self::set_money).
/// Operation primitives apply their simulated effect immediately and
/// return; wall-clock pacing lives entirely in the executor's timed wait.
pub struct SimRuntime {
    targets: Mutex<HashMap<String, SimTarget>>,
    network: HashMap<String, Vec<String>>,
    player: PlayerSnapshot,
    free_ram_gb: Mutex<f64>,
    printed: Mutex<Vec<String>>,
    fail_reason: Mutex<Option<String>>,
}

impl SimRuntime {
    /// Build a runtime over an adjacency list
    pub fn new(network: Vec<(String, Vec<String>)>) -> Self {
        let targets = network
            .iter()
            .map(|(host, _)| (host.clone(), SimTarget::default()))
            .collect();
        Self {
            targets: Mutex::new(targets),
            network: network.into_iter().collect(),
            player: PlayerSnapshot {
                hacking_level: 100,
                hacking_exp: 5000.0,
            },
            free_ram_gb: Mutex::new(1024.0),
            printed: Mutex::new(Vec::new()),
            fail_reason: Mutex::new(None),
        }
    }

    /// Override a host's security level
    pub fn set_security(&self, host: &str, security_level: f64) {
        if let Some(target) = self.targets.lock().get_mut(host) {
            target.security_level = security_level;
        }
    }

    /// Override a host's current money
    pub fn set_money(&self, host: &str, money: f64) {
        if let Some(target) = self.targets.lock().get_mut(host) {
            target.money = money;
        }
    }

    /// Override the dispatching host's free RAM
    pub fn set_free_ram(&self, free_ram_gb: f64) {
        *self.free_ram_gb.lock() = free_ram_gb;
    }

    /// Make the next operation primitive fail with `reason` (one-shot)
    pub fn fail_next_operation(&self, reason: &str) {
        *self.fail_reason.lock() = Some(reason.to_string());
    }

    /// Everything written to the print channel so far
    pub fn printed(&self) -> Vec<String> {
        self.printed.lock().clone()
    }

    fn take_failure(&self) -> Option<String> {
        self.fail_reason.lock().take()
    }

    fn with_target<T>(
        &self,
        host: &str,
        f: impl FnOnce(&mut SimTarget) -> T,
    ) -> RuntimeResult<T> {
        let mut targets = self.targets.lock();
        let target = targets
            .get_mut(host)
            .ok_or_else(|| format!("unknown host: {host}"))?;
        Ok(f(target))
    }
}

#[async_trait]
impl GameRuntime for SimRuntime {
    async fn weaken(&self, target: &str, opts: RunOptions) -> RuntimeResult<f64> {
        if let Some(reason) = self.take_failure() {
            return Err(reason.into());
        }
        self.with_target(target, |t| {
            let drop = WEAKEN_DROP_PER_THREAD * opts.threads as f64;
            let before = t.security_level;
            t.security_level = (t.security_level - drop).max(t.min_security_level);
            before - t.security_level
        })
    }

    async fn grow(&self, target: &str, opts: RunOptions) -> RuntimeResult<f64> {
        if let Some(reason) = self.take_failure() {
            return Err(reason.into());
        }
        self.with_target(target, |t| {
            let gain = GROW_FRACTION_PER_THREAD * t.max_money * opts.threads as f64;
            let before = t.money;
            t.money = (t.money + gain).min(t.max_money);
            t.security_level += GROW_RISE_PER_THREAD * opts.threads as f64;
            if before > 0.0 {
                t.money / before
            } else {
                f64::INFINITY
            }
        })
    }

    async fn hack(&self, target: &str, opts: RunOptions) -> RuntimeResult<f64> {
        if let Some(reason) = self.take_failure() {
            return Err(reason.into());
        }
        self.with_target(target, |t| {
            let wanted = HACK_PERCENT_PER_THREAD * t.max_money * opts.threads as f64;
            let gained = wanted.min(t.money);
            t.money -= gained;
            t.security_level += HACK_RISE_PER_THREAD * opts.threads as f64;
            gained
        })
    }

    async fn target_snapshot(&self, hostname: &str) -> RuntimeResult<TargetSnapshot> {
        let targets = self.targets.lock();
        let target = targets
            .get(hostname)
            .ok_or_else(|| format!("unknown host: {hostname}"))?;
        Ok(TargetSnapshot {
            hostname: hostname.to_string(),
            security_level: target.security_level,
            min_security_level: target.min_security_level,
            money: target.money,
            max_money: target.max_money,
        })
    }

    async fn player_snapshot(&self) -> RuntimeResult<PlayerSnapshot> {
        Ok(self.player)
    }

    async fn free_ram_gb(&self, _host: &str) -> RuntimeResult<f64> {
        Ok(*self.free_ram_gb.lock())
    }

    fn scan(&self, hostname: &str) -> Vec<String> {
        self.network.get(hostname).cloned().unwrap_or_default()
    }

    fn print(&self, message: &str) {
        self.printed.lock().push(message.to_string());
    }
}

/// Formula collaborator matching [`SimRuntime`]'s linear effect model
///
/// Durations default to the canonical 10s/40s/50s shape; the demo binary
/// shortens them so prep cycles finish quickly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimFormulas {
    /// Hack duration, in ms
    pub hack_time_ms: u64,
    /// Grow duration, in ms
    pub grow_time_ms: u64,
    /// Weaken duration, in ms
    pub weaken_time_ms: u64,
}

impl Default for SimFormulas {
    fn default() -> Self {
        Self {
            hack_time_ms: 10_000,
            grow_time_ms: 40_000,
            weaken_time_ms: 50_000,
        }
    }
}

/// Default sim formulas (10s hack, 40s grow, 50s weaken)
pub fn sim_formulas() -> SimFormulas {
    SimFormulas::default()
}

impl HackingFormulas for SimFormulas {
    fn hack_time_ms(&self, _target: &TargetSnapshot, _player: &PlayerSnapshot) -> u64 {
        self.hack_time_ms
    }

    fn grow_time_ms(&self, _target: &TargetSnapshot, _player: &PlayerSnapshot) -> u64 {
        self.grow_time_ms
    }

    fn weaken_time_ms(&self, _target: &TargetSnapshot, _player: &PlayerSnapshot) -> u64 {
        self.weaken_time_ms
    }

    fn hack_percent(&self, _target: &TargetSnapshot, _player: &PlayerSnapshot) -> f64 {
        HACK_PERCENT_PER_THREAD
    }

    fn growth_threads(
        &self,
        target: &TargetSnapshot,
        _player: &PlayerSnapshot,
        from_money: f64,
        to_money: f64,
    ) -> u32 {
        let deficit = (to_money - from_money).max(0.0);
        let per_thread = GROW_FRACTION_PER_THREAD * target.max_money;
        (deficit / per_thread).ceil() as u32
    }

    fn hack_security_rise(&self, threads: u32) -> f64 {
        HACK_RISE_PER_THREAD * threads as f64
    }

    fn grow_security_rise(&self, threads: u32) -> f64 {
        GROW_RISE_PER_THREAD * threads as f64
    }

    fn weaken_security_drop(&self, threads: u32) -> f64 {
        WEAKEN_DROP_PER_THREAD * threads as f64
    }
}

/// One accepted launch recorded by [`SimLauncher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCall {
    /// Script name passed to the launcher
    pub script: String,
    /// Host the launch targeted
    pub host: String,
    /// Requested thread count
    pub threads: u32,
    /// Positional arguments, in order
    pub args: Vec<String>,
}

/// Recording process launcher that never runs anything
#[derive(Default)]
pub struct SimLauncher {
    launches: Mutex<Vec<LaunchCall>>,
    next_pid: AtomicU64,
    fail_reason: Mutex<Option<String>>,
}

impl SimLauncher {
    /// All launches accepted so far, in order
    pub fn launches(&self) -> Vec<LaunchCall> {
        self.launches.lock().clone()
    }

    /// Make the next launch fail with `reason` (one-shot)
    pub fn fail_next_launch(&self, reason: &str) {
        *self.fail_reason.lock() = Some(reason.to_string());
    }
}

#[async_trait]
impl ProcessLauncher for SimLauncher {
    async fn launch(
        &self,
        script: &str,
        host: &str,
        threads: u32,
        args: &[String],
    ) -> RuntimeResult<u64> {
        if let Some(reason) = self.fail_reason.lock().take() {
            return Err(reason.into());
        }
        self.launches.lock().push(LaunchCall {
            script: script.to_string(),
            host: host.to_string(),
            threads,
            args: args.to_vec(),
        });
        Ok(self.next_pid.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Shared handles for driving a full plan-dispatch-execute cycle in tests
pub struct SimWorld {
    /// The simulated game runtime
    pub runtime: Arc<SimRuntime>,
    /// Matching formula collaborator
    pub formulas: Arc<SimFormulas>,
    /// Recording launcher
    pub launcher: Arc<SimLauncher>,
}

impl SimWorld {
    /// World over the standard [`sim_network`]
    pub fn new() -> Self {
        Self {
            runtime: Arc::new(SimRuntime::new(sim_network())),
            formulas: Arc::new(sim_formulas()),
            launcher: Arc::new(SimLauncher::default()),
        }
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
