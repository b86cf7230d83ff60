//! Batch Planner
//!
//! Composes weaken/grow/hack batches against a target and paces repeated
//! batches against the dispatching host's thread capacity.
//!
//! A target above its security floor or below its money ceiling gets a
//! prep batch (weaken-only, or grow plus a weaken sized to cancel the
//! grow's security rise) with no hack component. A fully prepped target
//! gets the standard four-operation extraction batch: hack, weaken after
//! hack, grow, weaken after grow, sized to remove a configured fraction
//! of max money per cycle while returning security to floor and money to
//! max by cycle end.
//!
//! Capacity is the only shared resource. The check here is a point-in-time
//! read immediately before dispatch, not a reservation; races against other
//! planners on the same host are an accepted limitation. A batch that does
//! not fit is deferred whole — partial dispatch would break the completion
//! ordering invariant.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::BatchConfig;
use crate::error::{HwgwError, Result};
use crate::runtime::{GameRuntime, HackingFormulas};
use crate::timing::{compute_offsets, OperationDurations};
use crate::types::{Batch, Operation, OperationKind, PlayerSnapshot, TargetSnapshot};

/// Stateless planner for single batches
#[derive(Debug, Clone)]
pub struct BatchPlanner {
    config: BatchConfig,
}

impl BatchPlanner {
    /// Create a planner with validated configuration
    pub fn new(config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Planner configuration
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Plan one batch for the target's current state
    ///
    /// Prep batches never contain a hack operation. Calling this twice on
    /// an unchanged target state yields identical relative offsets.
    ///
    /// # Errors
    ///
    /// Returns [`HwgwError::Plan`] when the target state or formula
    /// outputs cannot produce a coherent batch.
    pub fn plan_batch(
        &self,
        target: &TargetSnapshot,
        player: &PlayerSnapshot,
        formulas: &dyn HackingFormulas,
    ) -> Result<Batch> {
        self.plan_batch_capped(target, player, formulas, None)
    }

    /// Plan one batch, optionally capping prep thread counts
    ///
    /// The cap lets the repeating planner size a prep batch to the host's
    /// current capacity instead of deferring forever on small hosts. A cap
    /// never applies to extraction batches, which are all-or-nothing.
    pub fn plan_batch_capped(
        &self,
        target: &TargetSnapshot,
        player: &PlayerSnapshot,
        formulas: &dyn HackingFormulas,
        prep_thread_cap: Option<u32>,
    ) -> Result<Batch> {
        let durations = OperationDurations::compute(formulas, target, player);

        if target.security_above_floor() {
            self.plan_prep_weaken(target, formulas, &durations, prep_thread_cap)
        } else if target.money_below_max() {
            self.plan_prep_grow(target, player, formulas, &durations, prep_thread_cap)
        } else {
            self.plan_extraction(target, player, formulas, &durations)
        }
    }

    /// Weaken-only prep batch for a target above its security floor
    fn plan_prep_weaken(
        &self,
        target: &TargetSnapshot,
        formulas: &dyn HackingFormulas,
        durations: &OperationDurations,
        thread_cap: Option<u32>,
    ) -> Result<Batch> {
        let excess = target.security_level - target.min_security_level;
        let per_thread = formulas.weaken_security_drop(1);
        if per_thread <= 0.0 {
            return Err(HwgwError::Plan {
                target: target.hostname.clone(),
                reason: "formulas report zero weaken effect per thread".to_string(),
            });
        }

        let mut threads = (excess / per_thread).ceil() as u32;
        threads = threads.max(1);
        if let Some(cap) = thread_cap {
            threads = threads.min(cap.max(1));
        }

        let slots = compute_offsets(
            durations,
            &[OperationKind::Weaken],
            self.config.safety_margin_ms,
            None,
        )?;

        debug!(
            target = %target.hostname,
            excess_security = excess,
            threads = threads,
            "Planned weaken-only prep batch"
        );

        Ok(self.assemble(target, &slots, &[threads], durations))
    }

    /// Grow-led prep batch with a weaken sized to cancel the grow's
    /// security rise
    fn plan_prep_grow(
        &self,
        target: &TargetSnapshot,
        player: &PlayerSnapshot,
        formulas: &dyn HackingFormulas,
        durations: &OperationDurations,
        thread_cap: Option<u32>,
    ) -> Result<Batch> {
        let mut grow_threads = formulas
            .growth_threads(target, player, target.money, target.max_money)
            .max(1);
        if let Some(cap) = thread_cap {
            grow_threads = grow_threads.min(cap.max(1));
        }

        let mut weaken_threads = self.weaken_threads_for(
            formulas.grow_security_rise(grow_threads),
            formulas,
            target,
        )?;

        if let Some(cap) = thread_cap {
            let cap = cap.max(1);
            // Shrink grow and its paired weaken together until both fit.
            while grow_threads > 1 && grow_threads + weaken_threads > cap {
                let overshoot = grow_threads + weaken_threads - cap;
                grow_threads = grow_threads.saturating_sub(overshoot).max(1);
                weaken_threads = self.weaken_threads_for(
                    formulas.grow_security_rise(grow_threads),
                    formulas,
                    target,
                )?;
            }

            if grow_threads + weaken_threads > cap {
                // No grow+weaken pair fits this cap. Dispatch the grow
                // alone; the security it adds puts the target back above
                // floor, so the next cycle plans a weaken-only batch.
                let slots = compute_offsets(
                    durations,
                    &[OperationKind::Grow],
                    self.config.safety_margin_ms,
                    None,
                )?;

                debug!(
                    target = %target.hostname,
                    money = target.money,
                    max_money = target.max_money,
                    grow_threads = grow_threads,
                    cap = cap,
                    "Planned grow-only prep batch under tight capacity"
                );

                return Ok(self.assemble(target, &slots, &[grow_threads], durations));
            }
        }

        let slots = compute_offsets(
            durations,
            &[OperationKind::Grow, OperationKind::Weaken],
            self.config.safety_margin_ms,
            None,
        )?;

        debug!(
            target = %target.hostname,
            money = target.money,
            max_money = target.max_money,
            grow_threads = grow_threads,
            weaken_threads = weaken_threads,
            "Planned grow prep batch"
        );

        Ok(self.assemble(target, &slots, &[grow_threads, weaken_threads], durations))
    }

    /// Standard four-operation extraction batch for a fully prepped target
    fn plan_extraction(
        &self,
        target: &TargetSnapshot,
        player: &PlayerSnapshot,
        formulas: &dyn HackingFormulas,
        durations: &OperationDurations,
    ) -> Result<Batch> {
        let hack_percent = formulas.hack_percent(target, player);
        if hack_percent <= 0.0 {
            return Err(HwgwError::Plan {
                target: target.hostname.clone(),
                reason: "formulas report zero hack effect per thread".to_string(),
            });
        }

        let hack_threads = ((self.config.hack_fraction / hack_percent).floor() as u32).max(1);
        let extracted_fraction = hack_threads as f64 * hack_percent;
        let money_after_hack =
            (target.max_money * (1.0 - extracted_fraction)).max(0.0);

        let grow_threads = formulas
            .growth_threads(target, player, money_after_hack, target.max_money)
            .max(1);

        let weaken_after_hack = self.weaken_threads_for(
            formulas.hack_security_rise(hack_threads),
            formulas,
            target,
        )?;
        let weaken_after_grow = self.weaken_threads_for(
            formulas.grow_security_rise(grow_threads),
            formulas,
            target,
        )?;

        // Completion order: hack lands first, its weaken immediately after,
        // then grow, then the weaken that cancels the grow.
        let slots = compute_offsets(
            durations,
            &[
                OperationKind::Hack,
                OperationKind::Weaken,
                OperationKind::Grow,
                OperationKind::Weaken,
            ],
            self.config.safety_margin_ms,
            None,
        )?;

        info!(
            target = %target.hostname,
            hack_threads = hack_threads,
            grow_threads = grow_threads,
            weaken_after_hack = weaken_after_hack,
            weaken_after_grow = weaken_after_grow,
            extracted_fraction = extracted_fraction,
            "Planned extraction batch"
        );

        Ok(self.assemble(
            target,
            &slots,
            &[hack_threads, weaken_after_hack, grow_threads, weaken_after_grow],
            durations,
        ))
    }

    /// Weaken threads needed to cancel `security_rise`
    fn weaken_threads_for(
        &self,
        security_rise: f64,
        formulas: &dyn HackingFormulas,
        target: &TargetSnapshot,
    ) -> Result<u32> {
        let per_thread = formulas.weaken_security_drop(1);
        if per_thread <= 0.0 {
            return Err(HwgwError::Plan {
                target: target.hostname.clone(),
                reason: "formulas report zero weaken effect per thread".to_string(),
            });
        }
        Ok(((security_rise / per_thread).ceil() as u32).max(1))
    }

    fn assemble(
        &self,
        target: &TargetSnapshot,
        slots: &[crate::timing::PlannedSlot],
        threads: &[u32],
        durations: &OperationDurations,
    ) -> Batch {
        let operations = slots
            .iter()
            .zip(threads)
            .map(|(slot, threads)| Operation {
                kind: slot.kind,
                target: target.hostname.clone(),
                planned_delay_ms: slot.delay_ms,
                operation_id: Uuid::new_v4(),
                expected_duration_ms: durations.for_kind(slot.kind),
                threads: *threads,
            })
            .collect();

        Batch {
            target: target.hostname.clone(),
            planned_at: Utc::now(),
            operations,
        }
    }
}

/// Pick the next target to plan against
///
/// Targets still in prep state take priority over fully prepped targets:
/// an under-prepped target yields worse expected return per operation, so
/// finishing its prep first maximizes fleet-wide throughput. Ties keep
/// the caller's ordering.
pub fn select_target(candidates: &[TargetSnapshot]) -> Option<&TargetSnapshot> {
    candidates
        .iter()
        .find(|t| t.needs_prep())
        .or_else(|| candidates.first())
}

/// Restartable producer of capacity-paced batches against one target
///
/// Re-reads target, player, and host capacity each cycle, so external
/// state changes between cycles are picked up naturally. One instance per
/// target per dispatching host.
pub struct RepeatingPlanner {
    runtime: Arc<dyn GameRuntime>,
    formulas: Arc<dyn HackingFormulas>,
    planner: BatchPlanner,
    target: String,
    host: String,
}

impl RepeatingPlanner {
    /// Create a repeating planner for `target`, dispatching from `host`
    pub fn new(
        runtime: Arc<dyn GameRuntime>,
        formulas: Arc<dyn HackingFormulas>,
        config: BatchConfig,
        target: impl Into<String>,
        host: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            runtime,
            formulas,
            planner: BatchPlanner::new(config)?,
            target: target.into(),
            host: host.into(),
        })
    }

    /// Host thread capacity implied by free RAM at this instant
    pub fn thread_capacity(&self, free_ram_gb: f64) -> u32 {
        (free_ram_gb / self.planner.config.ram_per_thread_gb).floor() as u32
    }

    /// Plan the next cycle's batch, or defer
    ///
    /// Returns `Ok(None)` when the host lacks capacity for the whole batch
    /// this cycle — a backpressure signal, not an error. The next call
    /// re-reads state and re-evaluates capacity from scratch.
    ///
    /// # Errors
    ///
    /// Propagates runtime query failures and planning errors unchanged.
    pub async fn next_cycle(&self) -> Result<Option<Batch>> {
        let target = self
            .runtime
            .target_snapshot(&self.target)
            .await
            .map_err(|source| HwgwError::Query {
                subject: self.target.clone(),
                source,
            })?;
        let player = self
            .runtime
            .player_snapshot()
            .await
            .map_err(|source| HwgwError::Query {
                subject: "player".to_string(),
                source,
            })?;
        let free_ram = self
            .runtime
            .free_ram_gb(&self.host)
            .await
            .map_err(|source| HwgwError::Query {
                subject: self.host.clone(),
                source,
            })?;

        let capacity = self.thread_capacity(free_ram);
        if capacity == 0 {
            debug!(
                host = %self.host,
                free_ram_gb = free_ram,
                "Host has no free thread capacity, deferring cycle"
            );
            return Ok(None);
        }

        let prep_cap = if target.needs_prep() {
            Some(capacity)
        } else {
            None
        };
        let batch = self
            .planner
            .plan_batch_capped(&target, &player, self.formulas.as_ref(), prep_cap)?;

        if batch.total_threads() > capacity {
            debug!(
                host = %self.host,
                target = %self.target,
                needed_threads = batch.total_threads(),
                capacity = capacity,
                "Insufficient capacity for whole batch, deferring cycle"
            );
            return Ok(None);
        }

        Ok(Some(batch))
    }
}
