// SPDX-License-Identifier: GPL-3.0-only

//! A driver test double gated behind `POWER_PROFILE_DAEMON_FAKE_DRIVER`, used by
//! integration tests that exercise the manager without real sysfs I/O (spec §4.6,
//! "registry" — the env-gated entry is itself a registry-order concern).

use crate::driver::{ActivationReason, Driver, DriverEvent, DriverKind, ProbeResult};
use crate::errors::DriverError;
use crate::profile::{Profile, ProfileMask};
use tokio::sync::mpsc;

pub struct FakeDriver {
    name: &'static str,
    kind: DriverKind,
    supported: ProfileMask,
    active: Option<Profile>,
    degraded: String,
    events: Option<mpsc::UnboundedSender<DriverEvent>>,
    pub fail_next_activate: bool,
}

impl FakeDriver {
    pub fn new(name: &'static str, kind: DriverKind, supported: ProfileMask) -> Self {
        Self { name, kind, supported, active: None, degraded: String::new(), events: None, fail_next_activate: false }
    }

    pub fn cpu_all() -> Self { Self::new("fake-cpu", DriverKind::Cpu, ProfileMask::ALL) }

    pub fn platform_all() -> Self { Self::new("fake-platform", DriverKind::Platform, ProfileMask::ALL) }

    pub fn active_profile(&self) -> Option<Profile> { self.active }

    /// Simulates a firmware/keyboard-originated change, as if the driver pushed
    /// `profile-changed` on its own.
    pub fn simulate_external_change(&mut self, profile: Profile) {
        self.active = Some(profile);
        if let Some(events) = &self.events {
            let _ = events.send(DriverEvent::ProfileChanged(profile));
        }
    }

    pub fn set_degraded(&mut self, reason: &str) {
        self.degraded = reason.to_owned();
        if let Some(events) = &self.events {
            let _ = events.send(DriverEvent::DegradedChanged(self.degraded.clone()));
        }
    }
}

impl Driver for FakeDriver {
    fn name(&self) -> &'static str { self.name }

    fn kind(&self) -> DriverKind { self.kind }

    fn supported_profiles(&self) -> ProfileMask { self.supported }

    fn probe(&mut self) -> ProbeResult { ProbeResult::Success }

    fn activate(&mut self, profile: Profile, _reason: ActivationReason) -> Result<(), DriverError> {
        if self.fail_next_activate {
            self.fail_next_activate = false;
            return Err(DriverError::Activation {
                name: self.name,
                profile,
                source: crate::errors::SysfsError::NotFound("fake".into()),
            });
        }
        self.active = Some(profile);
        Ok(())
    }

    fn performance_degraded(&self) -> &str { &self.degraded }

    fn subscribe(&mut self, events: mpsc::UnboundedSender<DriverEvent>) { self.events = Some(events); }
}

/// True when `POWER_PROFILE_DAEMON_FAKE_DRIVER` is set to a truthy value.
pub fn enabled() -> bool {
    std::env::var("POWER_PROFILE_DAEMON_FAKE_DRIVER")
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false)
}
