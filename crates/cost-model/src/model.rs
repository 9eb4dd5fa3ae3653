// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The shared cost model.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use model_ir::{DeviceKind, ModelId, SubgraphId, SubgraphKey};
use parking_lot::{Mutex, RwLock};

use crate::{
    append_records, load_records, unix_micros, CostModelConfig, CostModelError, ProfileRecord,
    ThermalHistory, ThermalSample,
};

/// Bit pattern marking a cell that has never been observed.
const UNSET: u64 = u64::MAX;

/// One (subgraph, device) latency estimate.
#[derive(Debug)]
struct CostCell {
    latency_bits: AtomicU64,
    observations: AtomicU64,
}

impl CostCell {
    fn new() -> Self {
        Self {
            latency_bits: AtomicU64::new(UNSET),
            observations: AtomicU64::new(0),
        }
    }

    fn get(&self) -> Option<f64> {
        match self.latency_bits.load(Ordering::Acquire) {
            UNSET => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    /// Folds `latency` into the estimate. The first observation replaces the
    /// unset marker directly.
    fn observe(&self, latency: f64, alpha: f64) -> f64 {
        let mut current = self.latency_bits.load(Ordering::Acquire);
        loop {
            let next = if current == UNSET {
                latency
            } else {
                alpha * latency + (1.0 - alpha) * f64::from_bits(current)
            };
            match self.latency_bits.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.observations.fetch_add(1, Ordering::Relaxed);
                    return next;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Exported view of one cost entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CostEntry {
    pub key: SubgraphKey,
    pub device: DeviceKind,
    pub latency_us: f64,
    pub observations: u64,
}

/// Per-(subgraph, device) latency estimates plus per-device thermal state.
///
/// Shared as `Arc<CostModel>` between the planner, every worker thread and
/// the resource monitor.
#[derive(Debug)]
pub struct CostModel {
    config: CostModelConfig,
    entries: RwLock<HashMap<(SubgraphKey, DeviceKind), Arc<CostCell>>>,
    thermal: [Mutex<ThermalHistory>; 4],
    thermal_index: [AtomicU64; 4],
    model_names: RwLock<HashMap<ModelId, String>>,
    /// Profile records loaded from disk, keyed by model name, waiting for
    /// that model to be registered.
    warm_start: Mutex<HashMap<String, Vec<ProfileRecord>>>,
    journal: SegQueue<ProfileRecord>,
}

impl CostModel {
    pub fn new(config: CostModelConfig) -> Result<Self, CostModelError> {
        config.validate()?;
        let window = config.therm_window_size;
        Ok(Self {
            thermal: std::array::from_fn(|_| Mutex::new(ThermalHistory::new(window))),
            thermal_index: std::array::from_fn(|_| AtomicU64::new(1.0f64.to_bits())),
            entries: RwLock::new(HashMap::new()),
            model_names: RwLock::new(HashMap::new()),
            warm_start: Mutex::new(HashMap::new()),
            journal: SegQueue::new(),
            config,
        })
    }

    pub fn config(&self) -> &CostModelConfig {
        &self.config
    }

    fn cell(&self, key: SubgraphKey, device: DeviceKind) -> Option<Arc<CostCell>> {
        self.entries.read().get(&(key, device)).cloned()
    }

    fn cell_or_insert(&self, key: SubgraphKey, device: DeviceKind) -> Arc<CostCell> {
        if let Some(cell) = self.cell(key, device) {
            return cell;
        }
        self.entries
            .write()
            .entry((key, device))
            .or_insert_with(|| Arc::new(CostCell::new()))
            .clone()
    }

    // ── Latency ────────────────────────────────────────────────────

    /// Expected latency of `key` on `device`, in microseconds.
    ///
    /// Pairs that were never observed report the pessimistic default.
    pub fn estimate(&self, key: SubgraphKey, device: DeviceKind) -> f64 {
        self.cell(key, device)
            .and_then(|c| c.get())
            .unwrap_or(self.config.default_latency_us)
    }

    /// Expected latency scaled by the device's thermal index.
    pub fn thermal_estimate(&self, key: SubgraphKey, device: DeviceKind) -> f64 {
        self.estimate(key, device) * self.thermal_index(device)
    }

    /// Returns `true` once the pair has a seeded or observed value.
    pub fn is_profiled(&self, key: SubgraphKey, device: DeviceKind) -> bool {
        self.cell(key, device).is_some_and(|c| c.get().is_some())
    }

    /// Folds an observed latency into the pair's estimate and returns the
    /// new estimate.
    pub fn observe(&self, key: SubgraphKey, device: DeviceKind, latency_us: f64) -> f64 {
        let updated = self
            .cell_or_insert(key, device)
            .observe(latency_us, self.config.smoothing_factor);
        if self.config.journal {
            if let Some(model) = self.model_names.read().get(&key.model) {
                self.journal.push(ProfileRecord {
                    model: model.clone(),
                    subgraph: key.subgraph.0,
                    device,
                    timestamp_us: unix_micros(),
                    latency_us,
                });
            }
        }
        updated
    }

    /// Overwrites the pair's estimate, e.g. from offline profiling.
    pub fn seed(&self, key: SubgraphKey, device: DeviceKind, latency_us: f64) {
        self.cell_or_insert(key, device)
            .latency_bits
            .store(latency_us.to_bits(), Ordering::Release);
    }

    /// All entries that hold a value, ordered by key and device.
    pub fn entries(&self) -> Vec<CostEntry> {
        let mut out: Vec<CostEntry> = self
            .entries
            .read()
            .iter()
            .filter_map(|(&(key, device), cell)| {
                cell.get().map(|latency_us| CostEntry {
                    key,
                    device,
                    latency_us,
                    observations: cell.observations.load(Ordering::Relaxed),
                })
            })
            .collect();
        out.sort_by(|a, b| (a.key, a.device).cmp(&(b.key, b.device)));
        out
    }

    // ── Thermal ────────────────────────────────────────────────────

    /// Records a sensor reading and refreshes the device's thermal index.
    pub fn update_thermal(&self, device: DeviceKind, sample: ThermalSample) {
        let index = {
            let mut history = self.thermal[device.index()].lock();
            history.push(sample);
            history.index(self.config.throttle_temperature_mc)
        };
        let previous = f64::from_bits(
            self.thermal_index[device.index()].swap(index.to_bits(), Ordering::AcqRel),
        );
        if (index - previous).abs() > 0.05 {
            tracing::debug!("{device} thermal index {previous:.2} -> {index:.2}");
        }
    }

    /// Current thermal index of `device`; `1.0` is nominal.
    pub fn thermal_index(&self, device: DeviceKind) -> f64 {
        f64::from_bits(self.thermal_index[device.index()].load(Ordering::Acquire))
    }

    /// Copy of the retained sample window of `device`.
    pub fn thermal_history(&self, device: DeviceKind) -> Vec<ThermalSample> {
        self.thermal[device.index()].lock().samples().copied().collect()
    }

    // ── Profiles ───────────────────────────────────────────────────

    /// Loads a profile file for warm starts. Records are applied when a model
    /// of the same name is registered. Returns the number of records read.
    pub fn load_profile(&self, path: &Path) -> Result<usize, CostModelError> {
        let records = load_records(path)?;
        let count = records.len();
        let mut pending = self.warm_start.lock();
        for record in records {
            pending.entry(record.model.clone()).or_default().push(record);
        }
        tracing::info!("loaded {count} profile records from {}", path.display());
        Ok(count)
    }

    /// Associates `id` with `name` and replays any warm-start records for it.
    ///
    /// Returns the number of records applied.
    pub fn register_model(&self, id: ModelId, name: &str) -> usize {
        self.model_names.write().insert(id, name.to_string());
        let Some(records) = self.warm_start.lock().remove(name) else {
            return 0;
        };
        for record in &records {
            let key = SubgraphKey::new(id, SubgraphId(record.subgraph));
            self.cell_or_insert(key, record.device)
                .observe(record.latency_us, self.config.smoothing_factor);
        }
        tracing::debug!("model '{name}' warm-started from {} records", records.len());
        records.len()
    }

    /// Appends every journaled observation to `path`. Returns the number of
    /// records written.
    pub fn flush_profile(&self, path: &Path) -> Result<usize, CostModelError> {
        let mut records = Vec::with_capacity(self.journal.len());
        while let Some(record) = self.journal.pop() {
            records.push(record);
        }
        if records.is_empty() {
            return Ok(0);
        }
        append_records(path, &records)?;
        Ok(records.len())
    }
}
