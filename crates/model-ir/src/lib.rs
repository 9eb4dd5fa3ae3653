// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The operator-graph representation the engine schedules over.
//!
//! A model is a topologically ordered list of operators over a table of
//! tensor specifications. Each operator carries the set of device kinds
//! whose backend can execute it; the partitioner uses these support sets to
//! carve the graph into schedulable subgraphs.
//!
//! - [`DeviceKind`] / [`DeviceSet`]: the compute devices and compact sets of them.
//! - [`OpDef`]: one operator with its tensor inputs, outputs and device support.
//! - [`ModelGraph`]: the whole model, with a **type-state pattern**
//!   (`Loaded` → `Validated`).
//! - [`ModelId`], [`SubgraphId`], [`SubgraphKey`]: identifiers shared by the
//!   cost model, scheduler and runtime.
//!
//! # Example
//! ```
//! use model_ir::{DeviceKind, DeviceSet, ModelGraph};
//! use tensor_core::{DType, TensorSpec};
//!
//! let spec = TensorSpec::new("x", DType::F32, vec![1, 16]);
//! let graph = ModelGraph::sequential(
//!     "tiny",
//!     spec,
//!     &[DeviceSet::all(), DeviceSet::only(DeviceKind::Cpu)],
//! )
//! .validate()
//! .unwrap();
//! assert_eq!(graph.num_ops(), 2);
//! ```

mod device;
mod error;
pub mod graph;
mod ids;
mod op;

pub use device::{DeviceKind, DeviceSet};
pub use error::ModelError;
pub use graph::{Loaded, ModelGraph, Validated};
pub use ids::{ModelId, SubgraphId, SubgraphKey};
pub use op::OpDef;
