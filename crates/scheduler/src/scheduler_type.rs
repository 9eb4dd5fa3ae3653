// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Selectable scheduler types.

use std::fmt;
use std::str::FromStr;

use crate::policy::{
    FixedDevice, Heft, LeastSlackTimeFirst, RoundRobin, SchedulingPolicy, ShortestExpectedLatency,
};
use crate::SchedulerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerType {
    FixedDevice,
    RoundRobin,
    RoundRobinIdle,
    ShortestExpectedLatency,
    Heft,
    HeftReserved,
    LeastSlackTimeFirst,
    Thermal,
}

impl SchedulerType {
    pub const ALL: [SchedulerType; 8] = [
        SchedulerType::FixedDevice,
        SchedulerType::RoundRobin,
        SchedulerType::RoundRobinIdle,
        SchedulerType::ShortestExpectedLatency,
        SchedulerType::Heft,
        SchedulerType::HeftReserved,
        SchedulerType::LeastSlackTimeFirst,
        SchedulerType::Thermal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchedulerType::FixedDevice => "fixed_device",
            SchedulerType::RoundRobin => "round_robin",
            SchedulerType::RoundRobinIdle => "round_robin_idle",
            SchedulerType::ShortestExpectedLatency => "shortest_expected_latency",
            SchedulerType::Heft => "heft",
            SchedulerType::HeftReserved => "heft_reserved",
            SchedulerType::LeastSlackTimeFirst => "least_slack_time_first",
            SchedulerType::Thermal => "thermal",
        }
    }

    /// Whether the policy needs a target worker on every request.
    pub fn requires_target(self) -> bool {
        self == SchedulerType::FixedDevice
    }

    pub fn create_policy(self) -> Box<dyn SchedulingPolicy> {
        match self {
            SchedulerType::FixedDevice => Box::new(FixedDevice),
            SchedulerType::RoundRobin => Box::new(RoundRobin::new()),
            SchedulerType::RoundRobinIdle => Box::new(RoundRobin::idle()),
            SchedulerType::ShortestExpectedLatency => Box::new(ShortestExpectedLatency::new()),
            SchedulerType::Heft => Box::new(Heft::new()),
            SchedulerType::HeftReserved => Box::new(Heft::reserved()),
            SchedulerType::LeastSlackTimeFirst => Box::new(LeastSlackTimeFirst),
            SchedulerType::Thermal => Box::new(ShortestExpectedLatency::thermal()),
        }
    }
}

impl fmt::Display for SchedulerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulerType {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let ty = match normalized.as_str() {
            "fixeddevice" | "fixedworker" | "fixed" => SchedulerType::FixedDevice,
            "roundrobin" | "rr" => SchedulerType::RoundRobin,
            "roundrobinidle" | "rridle" => SchedulerType::RoundRobinIdle,
            "shortestexpectedlatency" | "sel" => SchedulerType::ShortestExpectedLatency,
            "heft" | "heterogeneousearliestfinishtime" => SchedulerType::Heft,
            "heftreserved" | "heterogeneousearliestfinishtimereserved" => {
                SchedulerType::HeftReserved
            }
            "leastslacktimefirst" | "leastslackfirst" | "lst" | "lstf" => {
                SchedulerType::LeastSlackTimeFirst
            }
            "thermal" => SchedulerType::Thermal,
            _ => return Err(SchedulerError::UnknownScheduler(s.to_string())),
        };
        Ok(ty)
    }
}

/// Checks a scheduler list: one scheduler, or two where the first handles
/// SLO jobs and the second the rest.
pub fn validate_schedulers(types: &[SchedulerType]) -> Result<(), SchedulerError> {
    match types.len() {
        1 => Ok(()),
        2 if types[0] == types[1] => Err(SchedulerError::InvalidConfig(format!(
            "scheduler `{}` listed twice",
            types[0]
        ))),
        2 => Ok(()),
        n => Err(SchedulerError::InvalidConfig(format!(
            "expected one or two schedulers, got {n}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("HEFT".parse::<SchedulerType>().unwrap(), SchedulerType::Heft);
        assert_eq!(
            "heft-reserved".parse::<SchedulerType>().unwrap(),
            SchedulerType::HeftReserved
        );
        assert_eq!("LSTF".parse::<SchedulerType>().unwrap(), SchedulerType::LeastSlackTimeFirst);
        assert!(matches!(
            "fifo".parse::<SchedulerType>(),
            Err(SchedulerError::UnknownScheduler(_))
        ));
    }

    #[test]
    fn test_names_match_policies() {
        for ty in SchedulerType::ALL {
            assert_eq!(ty.as_str().parse::<SchedulerType>().unwrap(), ty);
            assert_eq!(ty.create_policy().name(), ty.as_str());
        }
    }

    #[test]
    fn test_validate_scheduler_count() {
        assert!(validate_schedulers(&[SchedulerType::Heft]).is_ok());
        assert!(validate_schedulers(&[SchedulerType::LeastSlackTimeFirst, SchedulerType::RoundRobin]).is_ok());
        assert!(validate_schedulers(&[]).is_err());
        assert!(validate_schedulers(&[SchedulerType::Heft, SchedulerType::Heft]).is_err());
        assert!(validate_schedulers(&[SchedulerType::Heft; 3]).is_err());
    }
}
