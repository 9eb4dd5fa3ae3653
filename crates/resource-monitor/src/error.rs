// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for resource monitoring.

/// Errors that can occur when reading sensors or starting the monitor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Failed to read a sysfs or procfs file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a numeric value from a system file.
    #[error("failed to parse value from {path}: {detail}")]
    ParseError { path: String, detail: String },

    /// The configured sensor path does not exist on this machine.
    #[error("sensor path not found: {path}")]
    NotAvailable { path: String },

    /// A CPU list such as `0-3,6` is malformed.
    #[error("invalid cpu list `{0}`")]
    InvalidCpuList(String),

    /// The monitor configuration is invalid.
    #[error("invalid resource monitor configuration: {0}")]
    InvalidConfig(String),

    /// The polling thread could not be spawned.
    #[error("failed to spawn monitor thread: {0}")]
    Spawn(std::io::Error),
}
