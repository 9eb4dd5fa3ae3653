// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reading one device's sensors.

use std::path::Path;

use cost_model::{unix_micros, ThermalSample};
use model_ir::DeviceKind;

use crate::sysfs::read_integer;
use crate::{read_temperature_mc, DeviceSensorConfig, MonitorError};

/// Result of sampling one device, including the sensors that failed.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeviceReading {
    pub device: DeviceKind,
    pub sample: ThermalSample,
    /// Human-readable descriptions of unreadable sensors.
    pub errors: Vec<String>,
}

impl DeviceReading {
    /// Samples every configured sensor of `config`. Never fails: unreadable
    /// sensors leave their field unknown and are listed in `errors`.
    pub fn read(config: &DeviceSensorConfig) -> Self {
        let mut errors = Vec::new();
        let frequency_khz = sample_sensor(config.freq_path.as_deref(), &mut errors, read_integer)
            .map(|raw| config.freq_unit.to_khz(raw));
        let max_frequency_khz =
            sample_sensor(config.max_freq_path.as_deref(), &mut errors, read_integer)
                .map(|raw| config.freq_unit.to_khz(raw));
        let temperature_mc = sample_sensor(
            config.thermal_path.as_deref(),
            &mut errors,
            read_temperature_mc,
        );

        Self {
            device: config.device,
            sample: ThermalSample {
                timestamp_us: unix_micros(),
                frequency_khz,
                max_frequency_khz,
                temperature_mc,
            },
            errors,
        }
    }

    /// Current frequency as a fraction of the maximum, if both are known.
    pub fn frequency_ratio(&self) -> Option<f64> {
        match (self.sample.frequency_khz, self.sample.max_frequency_khz) {
            (Some(cur), Some(max)) if max > 0 => Some(cur as f64 / max as f64),
            _ => None,
        }
    }

    /// One-line description for status output.
    pub fn summary(&self) -> String {
        let freq = match (self.sample.frequency_khz, self.sample.max_frequency_khz) {
            (Some(cur), Some(max)) => format!("{} / {} MHz", cur / 1000, max / 1000),
            (Some(cur), None) => format!("{} MHz", cur / 1000),
            _ => "freq n/a".to_string(),
        };
        let temp = self
            .sample
            .temperature_mc
            .map_or("temp n/a".to_string(), |t| format!("{:.1}°C", t as f64 / 1000.0));
        let mut line = format!("{:<4} {freq}, {temp}", self.device.as_str());
        if !self.errors.is_empty() {
            line.push_str(&format!(" ({} sensor errors)", self.errors.len()));
        }
        line
    }
}

fn sample_sensor<T>(
    path: Option<&Path>,
    errors: &mut Vec<String>,
    read: impl Fn(&Path) -> Result<T, MonitorError>,
) -> Option<T> {
    match read(path?) {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::test_util::write_value;
    use crate::FrequencyUnit;

    #[test]
    fn test_read_all_sensors() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeviceSensorConfig {
            device: DeviceKind::Gpu,
            freq_path: Some(write_value(dir.path(), "cur", "300000000")),
            max_freq_path: Some(write_value(dir.path(), "max", "600000000")),
            thermal_path: Some(write_value(dir.path(), "temp", "61000")),
            freq_unit: FrequencyUnit::Hz,
        };
        let reading = DeviceReading::read(&config);
        assert!(reading.errors.is_empty());
        assert_eq!(reading.sample.frequency_khz, Some(300_000));
        assert_eq!(reading.sample.max_frequency_khz, Some(600_000));
        assert_eq!(reading.sample.temperature_mc, Some(61_000));
        assert_eq!(reading.frequency_ratio(), Some(0.5));
        assert!(reading.summary().contains("300 / 600 MHz"));
    }

    #[test]
    fn test_missing_sensors_degrade_to_unknown() {
        let mut config = DeviceSensorConfig::new(DeviceKind::Npu);
        config.freq_path = Some("/nonexistent/npu/cur_freq".into());
        let reading = DeviceReading::read(&config);
        assert!(reading.sample.is_unknown());
        assert_eq!(reading.errors.len(), 1);
        assert!(reading.summary().contains("freq n/a"));
    }
}
