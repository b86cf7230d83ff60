//! Error taxonomy for the batching core
//!
//! Infeasible timing and misconfiguration are caller errors; insufficient
//! capacity is a backpressure signal, not an error, and is represented as
//! an empty planning cycle rather than a variant here. Runtime primitive
//! failures pass through unchanged inside [`HwgwError::Runtime`].

use crate::types::OperationKind;

/// Crate-level error type
#[derive(Debug, thiserror::Error)]
pub enum HwgwError {
    /// A caller-pinned completion window cannot hold the requested ordering
    #[error("infeasible batch window: {kind} needs {required_ms}ms but only {available_ms}ms remain before its completion slot")]
    InfeasibleWindow {
        /// Operation that cannot fit
        kind: OperationKind,
        /// Duration the operation needs, in ms
        required_ms: u64,
        /// Window remaining before the operation's completion slot, in ms
        available_ms: u64,
    },

    /// Planner input validation failed
    #[error("plan error for {target}: {reason}")]
    Plan {
        /// Target the planner was sizing a batch for
        target: String,
        /// Human-readable description of what's wrong
        reason: String,
    },

    /// The external runtime primitive failed; propagated unchanged, no retry
    #[error("runtime {operation} against {target} failed: {source}")]
    Runtime {
        /// Which primitive failed
        operation: OperationKind,
        /// Target the primitive ran against
        target: String,
        /// The runtime's own error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A runtime state query failed; propagated unchanged, no retry
    #[error("runtime query for {subject} failed: {source}")]
    Query {
        /// What was being read (target or host name)
        subject: String,
        /// The runtime's own error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The dispatch primitive failed to launch an operation script
    #[error("dispatch of {operation} to host {host} failed: {reason}")]
    Dispatch {
        /// Operation kind being dispatched
        operation: OperationKind,
        /// Host the launch was attempted on
        host: String,
        /// Launcher's description of the failure
        reason: String,
    },

    /// Configuration value failed validation
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, HwgwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_window_display() {
        let err = HwgwError::InfeasibleWindow {
            kind: OperationKind::Weaken,
            required_ms: 50_000,
            available_ms: 40_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("infeasible"));
        assert!(msg.contains("weaken"));
        assert!(msg.contains("50000"));
    }

    #[test]
    fn test_configuration_display() {
        let err = HwgwError::Configuration("Invalid safety_margin_ms: bogus".to_string());
        assert!(err.to_string().starts_with("configuration error"));
    }
}
