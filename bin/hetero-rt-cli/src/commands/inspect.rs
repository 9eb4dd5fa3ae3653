// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `hetero-rt inspect` command: partition a synthetic model under every
//! preparation type and print the resulting subgraphs.

use model_ir::DeviceSet;
use partition_planner::{PartitionConfig, SubgraphPreparationType};

pub async fn execute(ops: String, devices: String, min_size: usize) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           hetero-rt · Partition Inspector            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let graph = super::synthetic_model(&ops, 1)?;
    let mut available = DeviceSet::empty();
    for device in super::parse_devices(&devices)? {
        available.insert(device);
    }

    println!("  {}", graph.summary());
    print!("{graph}");
    println!();

    for preparation in SubgraphPreparationType::ALL {
        let config = PartitionConfig::new(preparation, min_size);
        match partition_planner::partition(&graph, &config, available) {
            Ok(plan) => {
                print!("{}", plan.summary());
                for subgraph in &plan.subgraphs {
                    println!(
                        "    {}  units {}..{}  ops {}  on {}",
                        subgraph.id,
                        subgraph.units.start,
                        subgraph.units.end,
                        subgraph.num_ops(),
                        subgraph.devices,
                    );
                }
            }
            Err(e) => println!("  {}: {e}", preparation.as_str()),
        }
        println!();
    }
    Ok(())
}
