// SPDX-License-Identifier: GPL-3.0-only

//! Platform driver over the ACPI `platform_profile` sysfs interface (spec §4.4),
//! generalized from the teacher's `acpi_platform.rs` hardcoded three-function form into
//! a driver that reads `platform_profile_choices` and maps onto whatever the firmware
//! actually published.
//!
//! See the kernel docs for the interface this wraps:
//! <https://www.kernel.org/doc/html/latest/userspace-api/sysfs-platform_profile.html>

use crate::driver::{validate_supported_profiles, ActivationReason, Driver, DriverEvent, DriverKind, ProbeResult};
use crate::errors::DriverError;
use crate::profile::{Profile, ProfileMask};
use crate::sysfs::{self, AttrWatcher};
use tokio::sync::mpsc;

const NAME: &str = "platform_profile";
const PROFILE_PATH: &str = "/sys/firmware/acpi/platform_profile";
const CHOICES_PATH: &str = "/sys/firmware/acpi/platform_profile_choices";
const LAP_DETECT_PATH: &str = "/sys/firmware/acpi/platform_profile/dytc_lapmode";

pub struct AcpiPlatformDriver {
    low_power_token: &'static str,
    watcher: Option<AttrWatcher>,
    events: Option<mpsc::UnboundedSender<DriverEvent>>,
    degraded: String,
}

impl AcpiPlatformDriver {
    pub fn new() -> Self {
        Self { low_power_token: "low-power", watcher: None, events: None, degraded: String::new() }
    }
}

impl Default for AcpiPlatformDriver {
    fn default() -> Self { Self::new() }
}

impl Driver for AcpiPlatformDriver {
    fn name(&self) -> &'static str { NAME }

    fn kind(&self) -> DriverKind { DriverKind::Platform }

    fn supported_profiles(&self) -> ProfileMask { ProfileMask::ALL }

    fn probe(&mut self) -> ProbeResult {
        if validate_supported_profiles(NAME, self.supported_profiles()).is_err() {
            return ProbeResult::Fail;
        }
        let Ok(choices) = sysfs::read_attr(CHOICES_PATH) else {
            return ProbeResult::Fail;
        };
        let choices: Vec<&str> = choices.split_whitespace().collect();

        let low_power = ["low-power", "cool", "quiet"].iter().find(|c| choices.contains(c));
        let Some(&low_power) = low_power else {
            return ProbeResult::Defer;
        };
        if !choices.contains(&"balanced") || !choices.contains(&"performance") {
            return ProbeResult::Defer;
        }
        self.low_power_token = low_power;

        match AttrWatcher::new(PROFILE_PATH) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(err) => log::warn!("platform_profile: failed to watch {PROFILE_PATH}: {err}"),
        }
        ProbeResult::Success
    }

    fn activate(&mut self, profile: Profile, _reason: ActivationReason) -> Result<(), DriverError> {
        let token = match profile {
            Profile::PowerSaver => self.low_power_token,
            Profile::Balanced => "balanced",
            Profile::Performance => "performance",
            Profile::Unset => return Ok(()),
        };

        let write = || sysfs::write_attr(PROFILE_PATH, token);
        let result = match &self.watcher {
            Some(watcher) => watcher.suppressed(write),
            None => write(),
        };
        result.map_err(|source| DriverError::Activation { name: NAME, profile, source })?;

        self.refresh_degraded();
        Ok(())
    }

    fn performance_degraded(&self) -> &str { &self.degraded }

    fn subscribe(&mut self, events: mpsc::UnboundedSender<DriverEvent>) { self.events = Some(events); }

    /// Polls the watcher for an externally-driven `platform_profile` change (firmware
    /// hotkey or another tool writing the file directly) and forwards it as a
    /// [`DriverEvent::ProfileChanged`].
    fn poll_external_change(&mut self) {
        let Some(watcher) = &mut self.watcher else { return };
        match watcher.poll_changed() {
            Ok(true) => {
                if let Ok(current) = sysfs::read_attr(PROFILE_PATH) {
                    let profile = if current == self.low_power_token {
                        Profile::PowerSaver
                    } else {
                        Profile::from_str(&current)
                    };
                    if profile.has_single_flag() {
                        if let Some(events) = &self.events {
                            let _ = events.send(DriverEvent::ProfileChanged(profile));
                        }
                    }
                }
                self.refresh_degraded();
            }
            Ok(false) => {}
            Err(err) => log::warn!("platform_profile: watch error: {err}"),
        }
    }
}

impl AcpiPlatformDriver {
    /// Re-reads the Lenovo-style lap-proximity attribute, if present, and notifies the
    /// manager when the degraded reason changes.
    fn refresh_degraded(&mut self) {
        let lap_detected = sysfs::read_attr(LAP_DETECT_PATH).map(|v| v == "1").unwrap_or(false);
        let new_degraded = if lap_detected { "lap-detected" } else { "" };
        if new_degraded != self.degraded {
            self.degraded = new_degraded.to_owned();
            if let Some(events) = &self.events {
                let _ = events.send(DriverEvent::DegradedChanged(self.degraded.clone()));
            }
        }
    }
}
