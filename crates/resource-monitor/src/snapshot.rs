// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Point-in-time readings of every configured device.

use crate::{DeviceReading, DeviceSensorConfig};

/// Readings of all monitored devices, taken in one pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MonitorSnapshot {
    pub readings: Vec<DeviceReading>,
}

impl MonitorSnapshot {
    pub fn capture(devices: &[DeviceSensorConfig]) -> Self {
        Self {
            readings: devices.iter().map(DeviceReading::read).collect(),
        }
    }

    /// Returns `true` if any device runs below `ratio` of its maximum clock.
    pub fn is_throttled(&self, ratio: f64) -> bool {
        self.readings
            .iter()
            .filter_map(DeviceReading::frequency_ratio)
            .any(|r| r < ratio)
    }

    /// Returns a multi-line summary of all readings.
    pub fn summary(&self) -> String {
        if self.readings.is_empty() {
            return "no devices monitored".to_string();
        }
        self.readings
            .iter()
            .map(DeviceReading::summary)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
