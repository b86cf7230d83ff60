//! Core Data Model for Batched Operation Scheduling
//!
//! Snapshots of external game state, the operations the core schedules
//! against that state, and the records emitted when operations execute.
//! All mutation of target state happens inside the external runtime; the
//! types here are point-in-time reads and planning artifacts only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point-in-time read of a simulated server's attributes
///
/// Owned by the external game runtime. The core never mutates these values
/// directly; it requests operations whose effects the runtime computes.
///
/// # Examples
///
/// ```rust
/// use hwgw_core::types::TargetSnapshot;
///
/// let target = TargetSnapshot {
///     hostname: "n00dles".to_string(),
///     security_level: 10.0,
///     min_security_level: 5.0,
///     money: 0.0,
///     max_money: 1_000_000.0,
/// };
/// assert!(target.needs_prep());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// Server identifier known to the runtime
    pub hostname: String,

    /// Current security level (always >= `min_security_level`)
    pub security_level: f64,

    /// Security floor, constant per target
    pub min_security_level: f64,

    /// Current money on the server (0 <= money <= `max_money`)
    pub money: f64,

    /// Money ceiling, constant per target
    pub max_money: f64,
}

impl TargetSnapshot {
    /// Whether security sits above the floor
    pub fn security_above_floor(&self) -> bool {
        self.security_level > self.min_security_level
    }

    /// Whether money sits below the ceiling
    pub fn money_below_max(&self) -> bool {
        self.money < self.max_money
    }

    /// Whether the target requires a prep cycle before extraction
    pub fn needs_prep(&self) -> bool {
        self.security_above_floor() || self.money_below_max()
    }
}

/// Player skill inputs to the runtime's duration and effect formulas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Hacking skill level
    pub hacking_level: u32,

    /// Accumulated hacking experience
    pub hacking_exp: f64,
}

/// The three operation kinds the runtime can perform against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Extract money; raises security
    Hack,
    /// Restore money toward the ceiling; raises security
    Grow,
    /// Lower security toward the floor
    Weaken,
}

impl OperationKind {
    /// Single-letter tag used in logs and observer records
    pub fn tag(&self) -> &'static str {
        match self {
            OperationKind::Hack => "H",
            OperationKind::Grow => "G",
            OperationKind::Weaken => "W",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Hack => write!(f, "hack"),
            OperationKind::Grow => write!(f, "grow"),
            OperationKind::Weaken => write!(f, "weaken"),
        }
    }
}

/// One planned operation within a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// What to execute
    pub kind: OperationKind,

    /// Target server hostname
    pub target: String,

    /// Delay from batch epoch before the runtime primitive fires, in ms
    pub planned_delay_ms: u64,

    /// Unique within a batch; correlates logged actual timings with the plan
    pub operation_id: Uuid,

    /// Predicted duration from planning-time formulas, in ms
    pub expected_duration_ms: u64,

    /// Thread count the dispatch primitive should launch with
    pub threads: u32,
}

impl Operation {
    /// Planned completion time relative to batch epoch, in ms
    pub fn planned_completion_ms(&self) -> u64 {
        self.planned_delay_ms + self.expected_duration_ms
    }
}

/// A coordinated group of operations against one target
///
/// Constructed once per planning cycle and discarded after dispatch.
/// Operations are ordered by intended completion: assuming predicted
/// durations hold, completions land in vector order with at least the
/// planner's safety margin between consecutive completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Target server all operations share
    pub target: String,

    /// Planning epoch for the batch (delays are relative to this instant)
    pub planned_at: DateTime<Utc>,

    /// Operations in intended completion order
    pub operations: Vec<Operation>,
}

impl Batch {
    /// Total thread-equivalents the batch needs on the dispatching host
    pub fn total_threads(&self) -> u32 {
        self.operations.iter().map(|op| op.threads).sum()
    }

    /// Whether the batch contains a hack operation (false for prep batches)
    pub fn is_extraction(&self) -> bool {
        self.operations
            .iter()
            .any(|op| op.kind == OperationKind::Hack)
    }
}

/// Record emitted when an operation actually executes
///
/// Consumed by an optional observer; absence of any observer must not
/// affect operation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// Operation kind that ran
    pub kind: OperationKind,

    /// Wall-clock start, taken after the timed wait completed
    pub actual_start: DateTime<Utc>,

    /// Wall-clock end, taken when the runtime primitive returned
    pub actual_end: DateTime<Utc>,

    /// Correlates with the planned operation
    pub operation_id: Uuid,
}

impl DispatchRecord {
    /// Compact JSON form consumed by host-side visualizers, keyed by the
    /// single-letter kind tag
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind.tag(),
            "start": self.actual_start.timestamp_millis(),
            "end": self.actual_end.timestamp_millis(),
            "operationId": self.operation_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(security: f64, money: f64) -> TargetSnapshot {
        TargetSnapshot {
            hostname: "n00dles".to_string(),
            security_level: security,
            min_security_level: 5.0,
            money,
            max_money: 1_000_000.0,
        }
    }

    #[test]
    fn test_prep_detection() {
        assert!(target(10.0, 1_000_000.0).needs_prep());
        assert!(target(5.0, 500_000.0).needs_prep());
        assert!(!target(5.0, 1_000_000.0).needs_prep());
    }

    #[test]
    fn test_operation_completion_time() {
        let op = Operation {
            kind: OperationKind::Weaken,
            target: "n00dles".to_string(),
            planned_delay_ms: 40,
            operation_id: Uuid::new_v4(),
            expected_duration_ms: 50_000,
            threads: 1,
        };
        assert_eq!(op.planned_completion_ms(), 50_040);
    }

    #[test]
    fn test_dispatch_record_json_shape() {
        let record = DispatchRecord {
            kind: OperationKind::Hack,
            actual_start: Utc::now(),
            actual_end: Utc::now(),
            operation_id: Uuid::new_v4(),
        };
        let json = record.to_json();
        assert_eq!(json["kind"], "H");
        assert_eq!(json["operationId"], record.operation_id.to_string());
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(OperationKind::Hack.tag(), "H");
        assert_eq!(OperationKind::Grow.tag(), "G");
        assert_eq!(OperationKind::Weaken.tag(), "W");
        assert_eq!(OperationKind::Weaken.to_string(), "weaken");
    }
}
