// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the subgraph partitioner.

/// Errors raised while partitioning a model at registration time.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    /// An operator cannot run on any device that has a worker.
    #[error("model '{model}': no available device supports operator {op} ('{name}')")]
    NoSupportingDevice {
        model: String,
        op: usize,
        name: String,
    },

    /// The preparation type needs one device for the whole graph, and none qualifies.
    #[error("model '{model}': no single device can run the whole graph")]
    NoFullGraphDevice { model: String },

    /// The model graph has no operators.
    #[error("cannot partition an empty model graph")]
    EmptyModel,

    /// A strategy produced subgraphs that violate the plan invariants.
    #[error("strategy '{strategy}' produced an inconsistent plan: {detail}")]
    Inconsistent { strategy: String, detail: String },

    /// The partitioner was configured with invalid parameters.
    #[error("invalid partition configuration: {0}")]
    InvalidConfig(String),
}
