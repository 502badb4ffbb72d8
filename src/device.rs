// SPDX-License-Identifier: GPL-3.0-only

//! Sysfs device enumeration (spec §4.1, component 2). Drivers probe by subsystem and
//! filter by attribute predicate rather than hardcoding a single device path, so a
//! driver written for `cpu0` generalizes to whatever CPUs are actually present.

use crate::sysfs;
use std::path::{Path, PathBuf};

/// One entry under `/sys/class/<subsystem>/` or `/sys/bus/<subsystem>/devices/`.
#[derive(Debug, Clone)]
pub struct Device {
    pub path: PathBuf,
    pub name: String,
}

impl Device {
    pub fn attr_path(&self, attr: &str) -> PathBuf { self.path.join(attr) }

    pub fn read_attr(&self, attr: &str) -> Result<String, crate::errors::SysfsError> {
        sysfs::read_attr(self.attr_path(attr))
    }

    pub fn write_attr(&self, attr: &str, value: &str) -> Result<(), crate::errors::SysfsError> {
        sysfs::write_attr(self.attr_path(attr), value)
    }

    pub fn has_attr(&self, attr: &str) -> bool { sysfs::resolve(self.attr_path(attr)).exists() }
}

/// Lists every device under a `/sys/class/<subsystem>` directory, sorted by name so
/// iteration order is deterministic across runs.
pub fn for_each_device(subsystem: &str) -> Vec<Device> {
    let class_dir = sysfs::resolve(format!("/sys/class/{subsystem}"));
    let mut devices = read_dir_devices(&class_dir);
    devices.sort_by(|a, b| a.name.cmp(&b.name));
    devices
}

/// Returns the first device under `/sys/class/<subsystem>` for which `predicate`
/// returns true, or `None` if no device matches or the subsystem doesn't exist.
pub fn find_device(subsystem: &str, predicate: impl Fn(&Device) -> bool) -> Option<Device> {
    for_each_device(subsystem).into_iter().find(predicate)
}

fn read_dir_devices(dir: &Path) -> Vec<Device> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_owned();
            Some(Device { path: entry.path(), name })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_each_device_on_missing_subsystem_is_empty() {
        let _guard = crate::test_support::lock_env();
        std::env::remove_var("UMOCKDEV_DIR");
        assert!(for_each_device("this-subsystem-does-not-exist-anywhere").is_empty());
    }

    #[test]
    fn find_device_respects_predicate() {
        let _guard = crate::test_support::lock_env();
        let dir = std::env::temp_dir().join(format!("ppm-devtest-{}", std::process::id()));
        let class_dir = dir.join("sys/class/fakesub");
        std::fs::create_dir_all(class_dir.join("cpu0")).unwrap();
        std::fs::create_dir_all(class_dir.join("cpu1")).unwrap();
        std::fs::write(class_dir.join("cpu1").join("marker"), "yes").unwrap();

        std::env::set_var("UMOCKDEV_DIR", &dir);
        let found = find_device("fakesub", |d| d.has_attr("marker"));
        assert_eq!(found.map(|d| d.name), Some("cpu1".to_owned()));
        std::env::remove_var("UMOCKDEV_DIR");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
