// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compute device kinds and compact sets of them.

use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// A class of compute device a worker can be bound to.
///
/// The discriminant doubles as the device's bit position in a [`DeviceSet`]
/// and as its index in per-device tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu = 0,
    Gpu = 1,
    Dsp = 2,
    Npu = 3,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 4] = [DeviceKind::Cpu, DeviceKind::Gpu, DeviceKind::Dsp, DeviceKind::Npu];

    /// Position of this device in per-device arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Gpu => "gpu",
            DeviceKind::Dsp => "dsp",
            DeviceKind::Npu => "npu",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(DeviceKind::Cpu),
            "gpu" => Ok(DeviceKind::Gpu),
            "dsp" => Ok(DeviceKind::Dsp),
            "npu" => Ok(DeviceKind::Npu),
            other => Err(ModelError::UnknownDevice(other.to_string())),
        }
    }
}

/// A set of [`DeviceKind`]s stored as a bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "Vec<DeviceKind>", into = "Vec<DeviceKind>")]
pub struct DeviceSet(u8);

impl DeviceSet {
    pub const fn empty() -> Self {
        DeviceSet(0)
    }

    pub const fn all() -> Self {
        DeviceSet(0b1111)
    }

    pub const fn only(device: DeviceKind) -> Self {
        DeviceSet(1 << device as u8)
    }

    pub fn insert(&mut self, device: DeviceKind) {
        self.0 |= 1 << device as u8;
    }

    pub fn remove(&mut self, device: DeviceKind) {
        self.0 &= !(1 << device as u8);
    }

    pub fn contains(self, device: DeviceKind) -> bool {
        self.0 & (1 << device as u8) != 0
    }

    pub fn intersection(self, other: DeviceSet) -> DeviceSet {
        DeviceSet(self.0 & other.0)
    }

    pub fn union(self, other: DeviceSet) -> DeviceSet {
        DeviceSet(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates members in ascending device order.
    pub fn iter(self) -> impl Iterator<Item = DeviceKind> {
        DeviceKind::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<DeviceKind> for DeviceSet {
    fn from_iter<I: IntoIterator<Item = DeviceKind>>(iter: I) -> Self {
        let mut set = DeviceSet::empty();
        for device in iter {
            set.insert(device);
        }
        set
    }
}

impl From<Vec<DeviceKind>> for DeviceSet {
    fn from(devices: Vec<DeviceKind>) -> Self {
        devices.into_iter().collect()
    }
}

impl From<DeviceSet> for Vec<DeviceKind> {
    fn from(set: DeviceSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Debug for DeviceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for DeviceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(DeviceKind::as_str).collect();
        write!(f, "{{{}}}", names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations() {
        let mut set = DeviceSet::only(DeviceKind::Cpu);
        set.insert(DeviceKind::Npu);
        assert!(set.contains(DeviceKind::Npu));
        assert!(!set.contains(DeviceKind::Gpu));
        assert_eq!(set.len(), 2);

        let gpu_npu: DeviceSet = [DeviceKind::Gpu, DeviceKind::Npu].into_iter().collect();
        assert_eq!(set.intersection(gpu_npu), DeviceSet::only(DeviceKind::Npu));
        assert_eq!(set.union(gpu_npu).len(), 3);

        set.remove(DeviceKind::Cpu);
        assert_eq!(set, DeviceSet::only(DeviceKind::Npu));
    }

    #[test]
    fn test_iter_is_ordered() {
        let set: DeviceSet = [DeviceKind::Npu, DeviceKind::Cpu, DeviceKind::Dsp].into_iter().collect();
        let order: Vec<_> = set.iter().collect();
        assert_eq!(order, vec![DeviceKind::Cpu, DeviceKind::Dsp, DeviceKind::Npu]);
    }

    #[test]
    fn test_parse_device() {
        assert_eq!("GPU".parse::<DeviceKind>().unwrap(), DeviceKind::Gpu);
        assert!("tpu".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceSet::all().to_string(), "{cpu,gpu,dsp,npu}");
        assert_eq!(DeviceSet::empty().to_string(), "{}");
    }

    #[test]
    fn test_serde_as_list() {
        let set: DeviceSet = [DeviceKind::Cpu, DeviceKind::Gpu].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["cpu","gpu"]"#);
        let back: DeviceSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
