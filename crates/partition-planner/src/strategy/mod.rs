// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`PartitionStrategy`] trait and one implementation per preparation type.

pub mod fallback;
pub mod merge;
pub mod no_fallback;
pub mod unit;

pub use fallback::FallbackPerWorker;
pub use merge::MergeUnits;
pub use no_fallback::NoFallback;
pub use unit::UnitsOnly;

use model_ir::{DeviceSet, ModelGraph, Validated};

use crate::{PartitionError, PartitionPlan, UnitSubgraph};

/// Turns a model's unit subgraphs into schedulable subgraphs.
///
/// Strategies are purely algorithmic (no I/O, no shared state), which keeps
/// them cheap to unit-test in isolation.
pub trait PartitionStrategy: Send + Sync {
    /// Name of the preparation type this strategy implements.
    fn name(&self) -> &str;

    /// Builds the plan for `graph` from its precomputed `units`.
    ///
    /// `available` is the set of devices that have at least one worker.
    fn partition(
        &self,
        graph: &ModelGraph<Validated>,
        units: &[UnitSubgraph],
        available: DeviceSet,
    ) -> Result<PartitionPlan, PartitionError>;
}
