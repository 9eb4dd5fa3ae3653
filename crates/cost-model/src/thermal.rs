// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Thermal samples and the per-device thermal index.
//!
//! The index is `1.0` for a device running at its maximum frequency and
//! grows as the device is throttled:
//!
//! ```text
//! index = max_frequency / mean(recent frequencies)     clamped to [1, 4]
//! index *= 1.25                                        if the newest temperature
//!                                                      is at or above the threshold
//! ```
//!
//! Samples with an unknown frequency do not contribute; a device without any
//! usable sample is treated as nominal.

use std::collections::VecDeque;

/// Upper bound of the thermal index.
pub const MAX_THERMAL_INDEX: f64 = 4.0;

const HOT_PENALTY: f64 = 1.25;

/// One frequency/temperature reading of a device.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ThermalSample {
    pub timestamp_us: u64,
    /// Current frequency in kHz, if readable.
    pub frequency_khz: Option<u64>,
    /// Maximum frequency in kHz, if readable.
    pub max_frequency_khz: Option<u64>,
    /// Temperature in millidegrees Celsius, if readable.
    pub temperature_mc: Option<i64>,
}

impl ThermalSample {
    /// A reading where every sensor was unavailable.
    pub fn unknown(timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            ..Default::default()
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.frequency_khz.is_none() && self.temperature_mc.is_none()
    }
}

/// Bounded sample window of one device.
#[derive(Debug, Clone)]
pub struct ThermalHistory {
    window: usize,
    samples: VecDeque<ThermalSample>,
    max_frequency_khz: Option<u64>,
}

impl ThermalHistory {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::with_capacity(window.max(1)),
            max_frequency_khz: None,
        }
    }

    /// Appends a sample, evicting the oldest one beyond the window.
    pub fn push(&mut self, sample: ThermalSample) {
        let observed_max = sample.max_frequency_khz.or(sample.frequency_khz);
        if let Some(max) = observed_max {
            self.max_frequency_khz = Some(self.max_frequency_khz.map_or(max, |m| m.max(max)));
        }
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn samples(&self) -> impl Iterator<Item = &ThermalSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&ThermalSample> {
        self.samples.back()
    }

    /// Computes the thermal index over the retained window.
    pub fn index(&self, throttle_temperature_mc: Option<i64>) -> f64 {
        let freqs: Vec<u64> = self
            .samples
            .iter()
            .filter_map(|s| s.frequency_khz)
            .filter(|&f| f > 0)
            .collect();

        let mut index = match (self.max_frequency_khz, freqs.is_empty()) {
            (Some(max), false) => {
                let mean = freqs.iter().sum::<u64>() as f64 / freqs.len() as f64;
                (max as f64 / mean).clamp(1.0, MAX_THERMAL_INDEX)
            }
            _ => 1.0,
        };

        let hot = match (throttle_temperature_mc, self.latest().and_then(|s| s.temperature_mc)) {
            (Some(limit), Some(temp)) => temp >= limit,
            _ => false,
        };
        if hot {
            index = (index * HOT_PENALTY).min(MAX_THERMAL_INDEX);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freq(cur: u64, max: u64) -> ThermalSample {
        ThermalSample {
            timestamp_us: 0,
            frequency_khz: Some(cur),
            max_frequency_khz: Some(max),
            temperature_mc: Some(40_000),
        }
    }

    #[test]
    fn test_nominal_when_empty_or_unknown() {
        let mut h = ThermalHistory::new(4);
        assert_eq!(h.index(Some(85_000)), 1.0);
        h.push(ThermalSample::unknown(1));
        assert!(h.latest().unwrap().is_unknown());
        assert_eq!(h.index(Some(85_000)), 1.0);
    }

    #[test]
    fn test_index_tracks_mean_frequency() {
        let mut h = ThermalHistory::new(4);
        h.push(freq(2_000_000, 2_000_000));
        assert_eq!(h.index(None), 1.0);
        h.push(freq(1_000_000, 2_000_000));
        // mean 1.5 GHz against 2 GHz
        assert!((h.index(None) - 2.0 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut h = ThermalHistory::new(2);
        h.push(freq(500_000, 2_000_000));
        h.push(freq(2_000_000, 2_000_000));
        h.push(freq(2_000_000, 2_000_000));
        assert_eq!(h.len(), 2);
        assert_eq!(h.index(None), 1.0);
    }

    #[test]
    fn test_index_is_clamped() {
        let mut h = ThermalHistory::new(1);
        h.push(freq(100_000, 2_000_000));
        assert_eq!(h.index(None), MAX_THERMAL_INDEX);
    }

    #[test]
    fn test_hot_device_is_penalized() {
        let mut h = ThermalHistory::new(4);
        h.push(ThermalSample {
            temperature_mc: Some(90_000),
            ..freq(2_000_000, 2_000_000)
        });
        assert!((h.index(Some(85_000)) - 1.25).abs() < 1e-9);
        assert_eq!(h.index(None), 1.0);
    }
}
