//! Timing Model for Batched Operations
//!
//! Computes per-operation wall-clock durations (by consuming the runtime's
//! formula collaborator) and the delay offsets that make a set of
//! independently dispatched operations complete in a required relative
//! order with a minimum safe spacing.
//!
//! Offsets are computed backward from a common final completion time:
//! each operation is assigned a completion slot, slots are separated by
//! the safety margin, and the operation's delay is whatever remains after
//! subtracting its duration from its slot. When the caller pins the final
//! completion time and an operation cannot fit, the model signals an
//! infeasible window rather than clamping a negative delay to zero, which
//! would silently violate ordering.

use crate::error::{HwgwError, Result};
use crate::runtime::HackingFormulas;
use crate::types::{OperationKind, PlayerSnapshot, TargetSnapshot};

/// Predicted durations for the three operation kinds against one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDurations {
    /// Hack duration, in ms
    pub hack_ms: u64,
    /// Grow duration, in ms
    pub grow_ms: u64,
    /// Weaken duration, in ms
    pub weaken_ms: u64,
}

impl OperationDurations {
    /// Compute durations from the runtime's formulas at planning time
    pub fn compute(
        formulas: &dyn HackingFormulas,
        target: &TargetSnapshot,
        player: &PlayerSnapshot,
    ) -> Self {
        Self {
            hack_ms: formulas.hack_time_ms(target, player),
            grow_ms: formulas.grow_time_ms(target, player),
            weaken_ms: formulas.weaken_time_ms(target, player),
        }
    }

    /// Duration for one operation kind
    pub fn for_kind(&self, kind: OperationKind) -> u64 {
        match kind {
            OperationKind::Hack => self.hack_ms,
            OperationKind::Grow => self.grow_ms,
            OperationKind::Weaken => self.weaken_ms,
        }
    }
}

/// One operation's place in a computed schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSlot {
    /// Operation kind occupying the slot
    pub kind: OperationKind,

    /// Delay from batch epoch before the operation fires, in ms
    pub delay_ms: u64,

    /// Planned completion time relative to batch epoch, in ms
    pub completion_ms: u64,
}

/// Compute delay offsets so completions land in `completion_order` with at
/// least `safety_margin_ms` between consecutive completions
///
/// `completion_order` lists operations earliest-completing first and may
/// repeat a kind (the standard extraction batch carries two weakens).
///
/// When `completion_at` is `None` the minimal feasible final completion
/// time is chosen automatically and the latest-firing constraint anchors
/// delay zero. When the caller pins `completion_at`, any operation whose
/// duration exceeds its remaining window yields
/// [`HwgwError::InfeasibleWindow`]; delays are never clamped.
///
/// # Errors
///
/// Returns [`HwgwError::InfeasibleWindow`] when a pinned completion time
/// cannot hold the requested ordering, and [`HwgwError::Plan`] when
/// `completion_order` is empty.
pub fn compute_offsets(
    durations: &OperationDurations,
    completion_order: &[OperationKind],
    safety_margin_ms: u64,
    completion_at: Option<u64>,
) -> Result<Vec<PlannedSlot>> {
    if completion_order.is_empty() {
        return Err(HwgwError::Plan {
            target: String::new(),
            reason: "completion_order must name at least one operation".to_string(),
        });
    }

    let last_index = completion_order.len() as u64 - 1;

    // Gap between an operation's completion slot and the final completion.
    let slot_gap = |index: usize| (last_index - index as u64) * safety_margin_ms;

    // Minimal final completion time that keeps every delay non-negative.
    let minimal_final_ms = completion_order
        .iter()
        .enumerate()
        .map(|(i, kind)| durations.for_kind(*kind) + slot_gap(i))
        .max()
        .unwrap_or(0);

    let final_ms = completion_at.unwrap_or(minimal_final_ms);

    let mut slots = Vec::with_capacity(completion_order.len());
    for (i, kind) in completion_order.iter().enumerate() {
        let duration = durations.for_kind(*kind);
        let completion_ms = final_ms.saturating_sub(slot_gap(i));
        let available = completion_ms;
        if duration > available {
            return Err(HwgwError::InfeasibleWindow {
                kind: *kind,
                required_ms: duration,
                available_ms: available,
            });
        }
        slots.push(PlannedSlot {
            kind: *kind,
            delay_ms: completion_ms - duration,
            completion_ms,
        });
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn durations() -> OperationDurations {
        OperationDurations {
            hack_ms: 10_000,
            grow_ms: 40_000,
            weaken_ms: 50_000,
        }
    }

    #[test]
    fn test_standard_four_op_offsets() {
        let order = [
            OperationKind::Hack,
            OperationKind::Weaken,
            OperationKind::Grow,
            OperationKind::Weaken,
        ];
        let slots = compute_offsets(&durations(), &order, 20, None).unwrap();

        // weaken1 fires first (delay 0); every completion is 20ms apart.
        assert_eq!(slots[1].delay_ms, 0);
        assert_eq!(slots[0].delay_ms, 39_980);
        assert_eq!(slots[2].delay_ms, 10_020);
        assert_eq!(slots[3].delay_ms, 40);

        let completions: Vec<u64> = slots.iter().map(|s| s.completion_ms).collect();
        assert_eq!(completions, vec![49_980, 50_000, 50_020, 50_040]);
        for pair in completions.windows(2) {
            assert!(pair[1] - pair[0] >= 20);
        }
    }

    #[test]
    fn test_delay_plus_duration_equals_completion() {
        let order = [OperationKind::Grow, OperationKind::Weaken];
        let slots = compute_offsets(&durations(), &order, 50, None).unwrap();
        for slot in &slots {
            assert_eq!(
                slot.delay_ms + durations().for_kind(slot.kind),
                slot.completion_ms
            );
        }
    }

    #[test]
    fn test_pinned_window_too_small_is_infeasible() {
        let order = [OperationKind::Hack, OperationKind::Weaken];
        let err = compute_offsets(&durations(), &order, 20, Some(40_000)).unwrap_err();
        match err {
            HwgwError::InfeasibleWindow {
                kind, required_ms, ..
            } => {
                assert_eq!(kind, OperationKind::Weaken);
                assert_eq!(required_ms, 50_000);
            }
            other => panic!("expected InfeasibleWindow, got {other:?}"),
        }
    }

    #[test]
    fn test_pinned_window_exact_fit() {
        let order = [OperationKind::Hack, OperationKind::Weaken];
        let slots = compute_offsets(&durations(), &order, 20, Some(50_000)).unwrap();
        assert_eq!(slots[1].delay_ms, 0);
        assert_eq!(slots[0].delay_ms, 39_980);
    }

    #[test]
    fn test_empty_order_rejected() {
        assert!(compute_offsets(&durations(), &[], 20, None).is_err());
    }

    #[test]
    fn test_single_operation_has_zero_delay() {
        let slots = compute_offsets(&durations(), &[OperationKind::Weaken], 20, None).unwrap();
        assert_eq!(slots[0].delay_ms, 0);
        assert_eq!(slots[0].completion_ms, 50_000);
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let order = [
            OperationKind::Hack,
            OperationKind::Weaken,
            OperationKind::Grow,
            OperationKind::Weaken,
        ];
        let a = compute_offsets(&durations(), &order, 20, None).unwrap();
        let b = compute_offsets(&durations(), &order, 20, None).unwrap();
        assert_eq!(a, b);
    }
}
