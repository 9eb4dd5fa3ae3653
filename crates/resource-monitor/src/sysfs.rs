// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Helpers for reading single-value sysfs files.

use std::path::Path;

use crate::MonitorError;

/// Reads a sysfs/procfs file and returns its trimmed content.
pub(crate) fn read_sysfs_file(path: &Path) -> Result<String, MonitorError> {
    if !path.exists() {
        return Err(MonitorError::NotAvailable {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| MonitorError::ReadError {
            path: path.display().to_string(),
            source: e,
        })
}

/// Reads a file holding one integer, such as `scaling_cur_freq`.
pub(crate) fn read_integer(path: &Path) -> Result<i64, MonitorError> {
    let content = read_sysfs_file(path)?;
    content.parse::<i64>().map_err(|_| MonitorError::ParseError {
        path: path.display().to_string(),
        detail: format!("expected an integer, got '{content}'"),
    })
}


#[cfg(test)]
mod tests {
    use super::test_util::write_value;
    use super::*;

    #[test]
    fn test_read_integer() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_value(dir.path(), "freq", "1800000\n");
        assert_eq!(read_integer(&p).unwrap(), 1_800_000);
    }

    #[test]
    fn test_missing_file() {
        let result = read_integer(Path::new("/nonexistent/sensor/value"));
        assert!(matches!(result, Err(MonitorError::NotAvailable { .. })));
    }

    #[test]
    fn test_invalid_content() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_value(dir.path(), "garbage", "not_a_number");
        assert!(matches!(read_integer(&p), Err(MonitorError::ParseError { .. })));
    }
}
