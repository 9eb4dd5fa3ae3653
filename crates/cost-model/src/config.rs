// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::CostModelError;

/// Tuning knobs of the [`crate::CostModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct CostModelConfig {
    /// Weight of the newest observation, `α` in `α·observed + (1-α)·estimate`.
    pub smoothing_factor: f64,
    /// Estimate reported for pairs that were never observed, in microseconds.
    pub default_latency_us: f64,
    /// Number of thermal samples retained per device.
    pub therm_window_size: usize,
    /// Temperature (millidegrees Celsius) at which a device counts as hot.
    pub throttle_temperature_mc: Option<i64>,
    /// Whether observations are journaled for [`crate::CostModel::flush_profile`].
    pub journal: bool,
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.1,
            default_latency_us: 1_000_000.0,
            therm_window_size: 8,
            throttle_temperature_mc: Some(85_000),
            journal: false,
        }
    }
}

impl CostModelConfig {
    pub fn validate(&self) -> Result<(), CostModelError> {
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(CostModelError::InvalidSmoothing(self.smoothing_factor));
        }
        if !(self.default_latency_us.is_finite() && self.default_latency_us > 0.0) {
            return Err(CostModelError::InvalidConfig(format!(
                "default_latency_us must be positive, got {}",
                self.default_latency_us
            )));
        }
        if self.therm_window_size == 0 {
            return Err(CostModelError::InvalidConfig(
                "therm_window_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CostModelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_smoothing_bounds() {
        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            let config = CostModelConfig {
                smoothing_factor: bad,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(CostModelError::InvalidSmoothing(_))));
        }
        let config = CostModelConfig {
            smoothing_factor: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = CostModelConfig {
            therm_window_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
