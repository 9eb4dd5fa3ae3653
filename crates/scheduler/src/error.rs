// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unknown scheduler type `{0}`")]
    UnknownScheduler(String),

    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}
