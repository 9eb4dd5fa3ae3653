// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Thermal zone readings via `/sys/class/thermal/`.
//!
//! The kernel reports temperatures in millidegrees Celsius (`54321` means
//! 54.321 °C). Some vendor drivers report whole degrees instead; values
//! below 1000 are scaled up so both conventions end up in millidegrees.

use std::path::Path;

use crate::sysfs::read_integer;
use crate::MonitorError;

/// Reads a thermal zone and returns millidegrees Celsius.
pub fn read_temperature_mc(path: &Path) -> Result<i64, MonitorError> {
    let raw = read_integer(path)?;
    if raw.abs() < 1000 {
        Ok(raw * 1000)
    } else {
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::test_util::write_value;

    #[test]
    fn test_parse_millidegrees() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_value(dir.path(), "temp", "54321\n");
        assert_eq!(read_temperature_mc(&p).unwrap(), 54_321);
    }

    #[test]
    fn test_whole_degrees_are_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_value(dir.path(), "temp", "47");
        assert_eq!(read_temperature_mc(&p).unwrap(), 47_000);
    }

    #[test]
    fn test_missing_zone() {
        let result = read_temperature_mc(Path::new("/nonexistent/thermal/temp"));
        assert!(matches!(result, Err(MonitorError::NotAvailable { .. })));
    }
}
