// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CPU sets in the kernel's list notation (`0-3,6`).
//!
//! Workers and the planner thread are pinned with these sets; the actual
//! affinity call belongs to the device backend.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::sysfs::read_sysfs_file;
use crate::MonitorError;

const CPU_ONLINE_PATH: &str = "/sys/devices/system/cpu/online";

/// A set of logical CPU ids. The empty set means "unrestricted".
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CpuSet {
    cpus: BTreeSet<u32>,
}

impl CpuSet {
    /// The unrestricted set.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_all(&self) -> bool {
        self.cpus.is_empty()
    }

    pub fn contains(&self, cpu: u32) -> bool {
        self.is_all() || self.cpus.contains(&cpu)
    }

    /// CPU ids in ascending order; empty when unrestricted.
    pub fn cpus(&self) -> impl Iterator<Item = u32> + '_ {
        self.cpus.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }
}

impl FromStr for CpuSet {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(CpuSet::all());
        }
        let invalid = || MonitorError::InvalidCpuList(s.to_string());
        let mut cpus = BTreeSet::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start_s, end_s)) = part.split_once('-') {
                let start: u32 = start_s.trim().parse().map_err(|_| invalid())?;
                let end: u32 = end_s.trim().parse().map_err(|_| invalid())?;
                if end < start {
                    return Err(invalid());
                }
                cpus.extend(start..=end);
            } else {
                cpus.insert(part.parse().map_err(|_| invalid())?);
            }
        }
        Ok(Self { cpus })
    }
}

impl TryFrom<String> for CpuSet {
    type Error = MonitorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CpuSet> for String {
    fn from(set: CpuSet) -> Self {
        set.to_string()
    }
}

/// Formats runs compactly, e.g. `{0,1,2,3,6}` as `0-3,6`.
impl fmt::Display for CpuSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str("all");
        }
        let mut parts = Vec::new();
        let mut iter = self.cpus.iter().copied().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end += 1;
                iter.next();
            }
            parts.push(if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            });
        }
        f.write_str(&parts.join(","))
    }
}

/// Number of online logical CPUs.
///
/// Falls back to the standard library's parallelism hint when sysfs is
/// unavailable.
pub fn online_cores() -> usize {
    read_sysfs_file(Path::new(CPU_ONLINE_PATH))
        .ok()
        .and_then(|s| s.parse::<CpuSet>().ok())
        .filter(|set| !set.is_all())
        .map(|set| set.len())
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
}
