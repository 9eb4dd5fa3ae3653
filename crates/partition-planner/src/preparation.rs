// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subgraph preparation modes and the partitioner configuration.

use std::fmt;
use std::str::FromStr;

use crate::strategy::{FallbackPerWorker, MergeUnits, NoFallback, PartitionStrategy, UnitsOnly};
use crate::PartitionError;

/// How a model's units are turned into schedulable subgraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgraphPreparationType {
    /// One subgraph spanning the whole graph.
    NoFallback,
    /// Per device, a whole-graph chain with fallback segments for unsupported ops.
    FallbackPerWorker,
    /// Every unit subgraph is scheduled on its own.
    UnitSubgraph,
    /// Units plus every contiguous merge of them that some device can run.
    #[default]
    MergeUnitSubgraph,
}

impl SubgraphPreparationType {
    pub const ALL: [SubgraphPreparationType; 4] = [
        SubgraphPreparationType::NoFallback,
        SubgraphPreparationType::FallbackPerWorker,
        SubgraphPreparationType::UnitSubgraph,
        SubgraphPreparationType::MergeUnitSubgraph,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubgraphPreparationType::NoFallback => "no_fallback",
            SubgraphPreparationType::FallbackPerWorker => "fallback_per_worker",
            SubgraphPreparationType::UnitSubgraph => "unit_subgraph",
            SubgraphPreparationType::MergeUnitSubgraph => "merge_unit_subgraph",
        }
    }

    /// Instantiates the strategy implementing this preparation mode.
    pub fn create_strategy(self) -> Box<dyn PartitionStrategy> {
        match self {
            SubgraphPreparationType::NoFallback => Box::new(NoFallback),
            SubgraphPreparationType::FallbackPerWorker => Box::new(FallbackPerWorker),
            SubgraphPreparationType::UnitSubgraph => Box::new(UnitsOnly),
            SubgraphPreparationType::MergeUnitSubgraph => Box::new(MergeUnits),
        }
    }
}

impl fmt::Display for SubgraphPreparationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubgraphPreparationType {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "nofallback" | "nofallbacksubgraph" => Ok(SubgraphPreparationType::NoFallback),
            "fallbackperworker" | "fallbackperdevice" => Ok(SubgraphPreparationType::FallbackPerWorker),
            "unitsubgraph" | "unit" => Ok(SubgraphPreparationType::UnitSubgraph),
            "mergeunitsubgraph" | "merge" => Ok(SubgraphPreparationType::MergeUnitSubgraph),
            _ => Err(PartitionError::InvalidConfig(format!(
                "unknown subgraph preparation type `{s}`"
            ))),
        }
    }
}

fn default_minimum_subgraph_size() -> usize {
    7
}

/// Partitioner settings, deserialized from the `[subgraph]` config section.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PartitionConfig {
    #[serde(default)]
    pub preparation_type: SubgraphPreparationType,
    /// Preferred operator count per unit subgraph.
    #[serde(default = "default_minimum_subgraph_size")]
    pub minimum_subgraph_size: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            preparation_type: SubgraphPreparationType::default(),
            minimum_subgraph_size: default_minimum_subgraph_size(),
        }
    }
}

impl PartitionConfig {
    pub fn new(preparation_type: SubgraphPreparationType, minimum_subgraph_size: usize) -> Self {
        Self {
            preparation_type,
            minimum_subgraph_size,
        }
    }

    pub fn validate(&self) -> Result<(), PartitionError> {
        if self.minimum_subgraph_size == 0 {
            return Err(PartitionError::InvalidConfig(
                "minimum_subgraph_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!(
            "NoFallbackSubgraph".parse::<SubgraphPreparationType>().unwrap(),
            SubgraphPreparationType::NoFallback
        );
        assert_eq!(
            "merge_unit_subgraph".parse::<SubgraphPreparationType>().unwrap(),
            SubgraphPreparationType::MergeUnitSubgraph
        );
        assert!("bogus".parse::<SubgraphPreparationType>().is_err());
    }

    #[test]
    fn test_round_trip_names() {
        for prep in SubgraphPreparationType::ALL {
            assert_eq!(prep.as_str().parse::<SubgraphPreparationType>().unwrap(), prep);
            assert_eq!(prep.create_strategy().name(), prep.as_str());
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = PartitionConfig::default();
        assert_eq!(config.minimum_subgraph_size, 7);
        assert_eq!(config.preparation_type, SubgraphPreparationType::MergeUnitSubgraph);
        assert!(config.validate().is_ok());
        assert!(PartitionConfig::new(SubgraphPreparationType::NoFallback, 0)
            .validate()
            .is_err());
    }
}
