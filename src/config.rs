//! Tunable configuration for planning and execution
//!
//! The extraction fraction and safety margin are deliberately configuration,
//! not contract: community-tuned values vary per target and host. Defaults
//! here are conservative enough to hold ordering on a lightly loaded host.

use crate::error::{HwgwError, Result};

/// Configuration shared by the timing model, planner, and executor
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Minimum separation between order-dependent completions, in ms
    pub safety_margin_ms: u64,

    /// Fraction of a target's max money one extraction batch removes (0, 1)
    pub hack_fraction: f64,

    /// Security drift above floor tolerated at hack time before warning
    pub security_tolerance: f64,

    /// RAM one worker thread occupies on the dispatching host, in GB
    pub ram_per_thread_gb: f64,

    /// Pause between planning cycles when capacity is exhausted, in ms
    pub cycle_pause_ms: u64,

    /// Capacity of the observation broadcast channel
    pub observer_channel_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            safety_margin_ms: 20,
            hack_fraction: 0.25,
            security_tolerance: 0.5,
            ram_per_thread_gb: 1.75,
            cycle_pause_ms: 200,
            observer_channel_capacity: 1000,
        }
    }
}

impl BatchConfig {
    /// Build configuration from environment variables, falling back to defaults
    ///
    /// Recognized variables: `HWGW_SAFETY_MARGIN_MS`, `HWGW_HACK_FRACTION`,
    /// `HWGW_SECURITY_TOLERANCE`, `HWGW_RAM_PER_THREAD_GB`,
    /// `HWGW_CYCLE_PAUSE_MS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(margin) = std::env::var("HWGW_SAFETY_MARGIN_MS") {
            config.safety_margin_ms = margin.parse().map_err(|e| {
                HwgwError::Configuration(format!("Invalid safety_margin_ms: {e}"))
            })?;
        }

        if let Ok(fraction) = std::env::var("HWGW_HACK_FRACTION") {
            config.hack_fraction = fraction.parse().map_err(|e| {
                HwgwError::Configuration(format!("Invalid hack_fraction: {e}"))
            })?;
        }

        if let Ok(tolerance) = std::env::var("HWGW_SECURITY_TOLERANCE") {
            config.security_tolerance = tolerance.parse().map_err(|e| {
                HwgwError::Configuration(format!("Invalid security_tolerance: {e}"))
            })?;
        }

        if let Ok(ram) = std::env::var("HWGW_RAM_PER_THREAD_GB") {
            config.ram_per_thread_gb = ram.parse().map_err(|e| {
                HwgwError::Configuration(format!("Invalid ram_per_thread_gb: {e}"))
            })?;
        }

        if let Ok(pause) = std::env::var("HWGW_CYCLE_PAUSE_MS") {
            config.cycle_pause_ms = pause.parse().map_err(|e| {
                HwgwError::Configuration(format!("Invalid cycle_pause_ms: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would silently break ordering or sizing
    pub fn validate(&self) -> Result<()> {
        if self.hack_fraction <= 0.0 || self.hack_fraction >= 1.0 {
            return Err(HwgwError::Configuration(format!(
                "hack_fraction must be in (0, 1), got {}",
                self.hack_fraction
            )));
        }
        if self.ram_per_thread_gb <= 0.0 {
            return Err(HwgwError::Configuration(format!(
                "ram_per_thread_gb must be positive, got {}",
                self.ram_per_thread_gb
            )));
        }
        if self.security_tolerance < 0.0 {
            return Err(HwgwError::Configuration(format!(
                "security_tolerance must be non-negative, got {}",
                self.security_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.safety_margin_ms, 20);
    }

    // Overrides and the parse-error path share one test so no parallel
    // test observes the temporarily mutated environment.
    #[test]
    fn test_from_env_overrides_and_rejects_bogus_values() {
        std::env::set_var("HWGW_HACK_FRACTION", "0.1");
        let config = BatchConfig::from_env().unwrap();
        assert_eq!(config.hack_fraction, 0.1);

        std::env::set_var("HWGW_HACK_FRACTION", "not-a-number");
        let err = BatchConfig::from_env().unwrap_err();
        assert!(matches!(err, HwgwError::Configuration(_)));
        assert!(err.to_string().contains("hack_fraction"));

        std::env::remove_var("HWGW_HACK_FRACTION");
    }

    #[test]
    fn test_rejects_full_extraction() {
        let config = BatchConfig {
            hack_fraction: 1.0,
            ..BatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_thread_ram() {
        let config = BatchConfig {
            ram_per_thread_gb: 0.0,
            ..BatchConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
