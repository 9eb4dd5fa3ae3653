// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cost-model
//!
//! Live performance knowledge used by the scheduling policies:
//!
//! - exponentially smoothed latency per (subgraph, device) pair, fed by
//!   worker threads after every invocation;
//! - a per-device thermal index derived from recent frequency and
//!   temperature samples, fed by the resource monitor;
//! - JSON-lines profile persistence for warm starts and offline analysis.
//!
//! # Concurrency
//!
//! Each (subgraph, device) entry is a pair of atomics updated with a
//! compare-and-swap loop. The entry map is only write-locked to insert a
//! key that has never been seen, so planner reads never wait on worker
//! updates of existing entries.

mod config;
mod error;
mod model;
mod profile;
mod thermal;

pub use config::CostModelConfig;
pub use error::CostModelError;
pub use model::{CostEntry, CostModel};
pub use profile::{append_records, load_records, ProfileRecord};
pub use thermal::{ThermalHistory, ThermalSample, MAX_THERMAL_INDEX};

/// Microseconds since the Unix epoch, used to timestamp samples and records.
pub fn unix_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
