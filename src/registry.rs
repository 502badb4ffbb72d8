// SPDX-License-Identifier: GPL-3.0-only

//! Driver/Action registry (spec §4.6): a statically ordered list of constructor
//! thunks, replacing the source's thunk-table-of-function-pointers with a slice of
//! boxed closures (design notes §9). Order matters — the first constructor of a given
//! kind that probes successfully wins, so hardware-specific drivers are listed before
//! the placeholder.

use crate::action::Action;
use crate::actions::{amdgpu_panel_power::AmdgpuPanelPowerAction, trickle_charge::TrickleChargeAction};
use crate::driver::Driver;
use crate::drivers::{
    acpi_platform::AcpiPlatformDriver, fake, intel_pstate::IntelPstateCpuDriver, placeholder::PlaceholderPlatformDriver,
};

type DriverThunk = fn() -> Box<dyn Driver>;
type ActionThunk = fn() -> Box<dyn Action>;

/// Names excluded from discovery via `POWER_PROFILE_DAEMON_DRIVER_BLOCK`.
fn blocked_driver_names() -> Vec<String> { blocked_names("POWER_PROFILE_DAEMON_DRIVER_BLOCK") }

/// Names excluded from discovery via `POWER_PROFILE_DAEMON_ACTION_BLOCK`.
fn blocked_action_names() -> Vec<String> { blocked_names("POWER_PROFILE_DAEMON_ACTION_BLOCK") }

fn blocked_names(var: &str) -> Vec<String> {
    std::env::var(var)
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect())
        .unwrap_or_default()
}

/// The ordered driver constructor list: real CPU/platform drivers first, the
/// placeholder platform driver last, with the fake driver present only when
/// `POWER_PROFILE_DAEMON_FAKE_DRIVER` is set.
pub fn driver_constructors() -> Vec<DriverThunk> {
    let mut thunks: Vec<DriverThunk> =
        vec![|| Box::new(IntelPstateCpuDriver::new()), || Box::new(AcpiPlatformDriver::new())];
    if fake::enabled() {
        thunks.push(|| Box::new(fake::FakeDriver::cpu_all()));
        thunks.push(|| Box::new(fake::FakeDriver::platform_all()));
    }
    thunks.push(|| Box::new(PlaceholderPlatformDriver::new()));
    thunks
}

pub fn action_constructors() -> Vec<ActionThunk> {
    vec![
        || Box::new(TrickleChargeAction::new()),
        || Box::new(AmdgpuPanelPowerAction::new()),
    ]
}

pub fn is_driver_blocked(name: &str) -> bool { blocked_driver_names().iter().any(|b| b == name) }

pub fn is_action_blocked(name: &str) -> bool { blocked_action_names().iter().any(|b| b == name) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_last() {
        let thunks = driver_constructors();
        let last = (thunks.last().unwrap())();
        assert_eq!(last.name(), "placeholder");
    }

    #[test]
    fn blocklist_parses_comma_separated_names() {
        let _guard = crate::test_support::lock_env();
        std::env::set_var("POWER_PROFILE_DAEMON_DRIVER_BLOCK", "intel_pstate, platform_profile");
        assert!(is_driver_blocked("intel_pstate"));
        assert!(is_driver_blocked("platform_profile"));
        assert!(!is_driver_blocked("placeholder"));
        std::env::remove_var("POWER_PROFILE_DAEMON_DRIVER_BLOCK");
    }
}
