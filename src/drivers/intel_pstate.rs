// SPDX-License-Identifier: GPL-3.0-only

//! CPU driver over Intel P-State (spec §4.4). Combines direct per-policy sysfs writes
//! (governor, EPP), grounded on `cpufreq.rs`'s `strcat!`-built paths, with the
//! `intel-pstate` crate's global min/max/no-turbo knobs, grounded on
//! `daemon/profiles.rs`'s `PStateValues` builder usage.

use crate::driver::{validate_supported_profiles, ActivationReason, Driver, DriverKind, ProbeResult};
use crate::errors::DriverError;
use crate::profile::{Profile, ProfileMask};
use crate::sysfs;
use concat_in_place::strcat;
use intel_pstate::PStateValues;

const NAME: &str = "intel_pstate";

/// ACPI `pm_profile` values considered server-class; the driver refuses to load on
/// these per spec §4.4.
const SERVER_PM_PROFILES: &[&str] = &["3", "4", "5", "6", "7"];

pub struct IntelPstateCpuDriver {
    /// Number of logical CPUs seen at probe time; cached since it doesn't change.
    num_cpus: usize,
    previous: Option<Profile>,
}

impl IntelPstateCpuDriver {
    pub fn new() -> Self { Self { num_cpus: 0, previous: None } }

    pub const fn kind_name() -> &'static str { NAME }
}

impl Default for IntelPstateCpuDriver {
    fn default() -> Self { Self::new() }
}

impl Driver for IntelPstateCpuDriver {
    fn name(&self) -> &'static str { NAME }

    fn kind(&self) -> DriverKind { DriverKind::Cpu }

    fn supported_profiles(&self) -> ProfileMask { ProfileMask::ALL }

    fn probe(&mut self) -> ProbeResult {
        if validate_supported_profiles(NAME, self.supported_profiles()).is_err() {
            return ProbeResult::Fail;
        }
        if !sysfs::resolve("/sys/devices/system/cpu/intel_pstate").is_dir() {
            return ProbeResult::Fail;
        }
        if matches!(sysfs::read_attr("/sys/devices/system/cpu/intel_pstate/status"), Ok(s) if s == "passive")
        {
            return ProbeResult::Fail;
        }
        if let Ok(profile) = sysfs::read_attr("/sys/firmware/acpi/pm_profile") {
            if SERVER_PM_PROFILES.contains(&profile.as_str()) {
                return ProbeResult::Fail;
            }
        }
        match num_cpus() {
            Some(n) if n > 0 => {
                self.num_cpus = n;
                ProbeResult::Success
            }
            _ => ProbeResult::Fail,
        }
    }

    fn activate(&mut self, profile: Profile, _reason: ActivationReason) -> Result<(), DriverError> {
        let (governor, epp, min_pct, max_pct, no_turbo) = match profile {
            Profile::PowerSaver => ("powersave", "power", 0u8, 50u8, true),
            Profile::Balanced => ("powersave", "balance_performance", 0u8, 100u8, false),
            Profile::Performance => ("performance", "performance", 0u8, 100u8, false),
            Profile::Unset => return Ok(()),
        };

        let mut written = Vec::new();
        for cpu in 0..self.num_cpus {
            if let Err(source) = write_cpu_policy(cpu, governor, epp) {
                rollback(&written, self.previous);
                return Err(DriverError::Activation { name: NAME, profile, source });
            }
            written.push(cpu);
        }

        if let Err(source) = set_global_pstate(min_pct, max_pct, no_turbo) {
            rollback(&written, self.previous);
            return Err(DriverError::Activation { name: NAME, profile, source });
        }

        self.previous = Some(profile);
        Ok(())
    }
}

fn write_cpu_policy(cpu: usize, governor: &str, epp: &str) -> Result<(), crate::errors::SysfsError> {
    let mut base = cpufreq_path(cpu);
    sysfs::write_attr(strcat!(&mut base, "scaling_governor"), governor)?;
    let mut base = cpufreq_path(cpu);
    let epp_path = strcat!(&mut base, "energy_performance_preference");
    if sysfs::resolve(&epp_path).exists() {
        sysfs::write_attr(epp_path, epp)?;
    }
    Ok(())
}

fn rollback(written: &[usize], previous: Option<Profile>) {
    let Some(previous) = previous else { return };
    let (governor, epp) = match previous {
        Profile::PowerSaver => ("powersave", "power"),
        Profile::Balanced => ("powersave", "balance_performance"),
        Profile::Performance => ("performance", "performance"),
        Profile::Unset => return,
    };
    for &cpu in written {
        if let Err(err) = write_cpu_policy(cpu, governor, epp) {
            log::warn!("intel_pstate: failed to roll back cpu{cpu} to {previous}: {err}");
        }
    }
}

/// Sets the global min/max percentage and no-turbo knobs via the `intel-pstate` crate.
/// Skipped under `UMOCKDEV_DIR` since the crate always targets the real sysfs root.
fn set_global_pstate(min_pct: u8, max_pct: u8, no_turbo: bool) -> Result<(), crate::errors::SysfsError> {
    if std::env::var_os("UMOCKDEV_DIR").is_some() {
        return Ok(());
    }
    let pstate = match intel_pstate::PState::new() {
        Ok(p) => p,
        Err(_) => return Ok(()),
    };
    let values = PStateValues::default().min_perf_pct(min_pct).max_perf_pct(max_pct).no_turbo(no_turbo);
    pstate.set_values(values).map_err(|source| crate::errors::SysfsError::Write {
        path: "/sys/devices/system/cpu/intel_pstate".into(),
        source: std::io::Error::new(std::io::ErrorKind::Other, source.to_string()),
    })
}

fn cpufreq_path(cpu: usize) -> String { format!("/sys/devices/system/cpu/cpu{cpu}/cpufreq/") }

fn num_cpus() -> Option<usize> {
    let info = sysfs::read_attr("/sys/devices/system/cpu/possible").ok()?;
    info.split('-').last()?.trim().parse::<usize>().ok().map(|n| n + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_fake_root() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("ppm-pstate-{}-{}", std::process::id(), line!()));
        std::fs::create_dir_all(dir.join("sys/devices/system/cpu/intel_pstate")).unwrap();
        std::fs::write(dir.join("sys/devices/system/cpu/possible"), "0-1\n").unwrap();
        std::fs::write(dir.join("sys/devices/system/cpu/intel_pstate/status"), "active\n").unwrap();
        for cpu in 0..2 {
            let policy = dir.join(format!("sys/devices/system/cpu/cpu{cpu}/cpufreq"));
            std::fs::create_dir_all(&policy).unwrap();
            std::fs::write(policy.join("scaling_governor"), "powersave\n").unwrap();
            std::fs::write(policy.join("energy_performance_preference"), "balance_performance\n").unwrap();
        }
        dir
    }

    #[test]
    fn probe_succeeds_with_two_cpus() {
        let _guard = crate::test_support::lock_env();
        let dir = setup_fake_root();
        std::env::set_var("UMOCKDEV_DIR", &dir);
        let mut driver = IntelPstateCpuDriver::new();
        assert_eq!(driver.probe(), ProbeResult::Success);
        assert_eq!(driver.num_cpus, 2);
        std::env::remove_var("UMOCKDEV_DIR");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn probe_fails_in_passive_mode() {
        let _guard = crate::test_support::lock_env();
        let dir = setup_fake_root();
        std::fs::write(dir.join("sys/devices/system/cpu/intel_pstate/status"), "passive\n").unwrap();
        std::env::set_var("UMOCKDEV_DIR", &dir);
        let mut driver = IntelPstateCpuDriver::new();
        assert_eq!(driver.probe(), ProbeResult::Fail);
        std::env::remove_var("UMOCKDEV_DIR");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn activate_writes_governor_and_epp_to_every_cpu() {
        let _guard = crate::test_support::lock_env();
        let dir = setup_fake_root();
        std::env::set_var("UMOCKDEV_DIR", &dir);
        let mut driver = IntelPstateCpuDriver::new();
        assert_eq!(driver.probe(), ProbeResult::Success);
        driver.activate(Profile::Performance, ActivationReason::User).unwrap();

        for cpu in 0..2 {
            let governor = sysfs::read_attr(format!("/sys/devices/system/cpu/cpu{cpu}/cpufreq/scaling_governor")).unwrap();
            assert_eq!(governor, "performance");
            let epp = sysfs::read_attr(format!(
                "/sys/devices/system/cpu/cpu{cpu}/cpufreq/energy_performance_preference"
            ))
            .unwrap();
            assert_eq!(epp, "performance");
        }
        std::env::remove_var("UMOCKDEV_DIR");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
