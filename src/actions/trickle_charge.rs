// SPDX-License-Identifier: GPL-3.0-only

//! Sets `charge_type` on every "Device"-scoped `power_supply` to `Trickle` on
//! `power-saver`, `Fast` otherwise (spec §4.5), grounded on the `power_supply` sysfs
//! layout used throughout `charge_thresholds.rs`.

use crate::action::{Action, ActionProbeResult};
use crate::device::{self, Device};
use crate::errors::ActionError;
use crate::profile::Profile;

const NAME: &str = "trickle_charge";

pub struct TrickleChargeAction {
    devices: Vec<Device>,
}

impl TrickleChargeAction {
    pub fn new() -> Self { Self { devices: Vec::new() } }
}

impl Default for TrickleChargeAction {
    fn default() -> Self { Self::new() }
}

fn is_device_scoped(d: &Device) -> bool {
    d.has_attr("charge_type") && matches!(d.read_attr("scope"), Ok(scope) if scope == "Device")
}

impl Action for TrickleChargeAction {
    fn name(&self) -> &'static str { NAME }

    fn probe(&mut self) -> ActionProbeResult {
        self.devices = device::for_each_device("power_supply").into_iter().filter(is_device_scoped).collect();
        if self.devices.is_empty() {
            ActionProbeResult::Fail
        } else {
            ActionProbeResult::Success
        }
    }

    fn apply(&mut self, profile: Profile) -> Result<(), ActionError> {
        let value = if profile == Profile::PowerSaver { "Trickle" } else { "Fast" };
        for device in &self.devices {
            device
                .write_attr("charge_type", value)
                .map_err(|source| ActionError::Apply { name: NAME, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_picks_up_only_device_scoped_supplies() {
        let _guard = crate::test_support::lock_env();
        let dir = std::env::temp_dir().join(format!("ppm-trickle-{}", std::process::id()));
        let class = dir.join("sys/class/power_supply");
        std::fs::create_dir_all(class.join("BAT0")).unwrap();
        std::fs::write(class.join("BAT0").join("scope"), "Device\n").unwrap();
        std::fs::write(class.join("BAT0").join("charge_type"), "Fast\n").unwrap();
        std::fs::create_dir_all(class.join("AC")).unwrap();
        std::fs::write(class.join("AC").join("scope"), "System\n").unwrap();

        std::env::set_var("UMOCKDEV_DIR", &dir);
        let mut action = TrickleChargeAction::new();
        assert_eq!(action.probe(), ActionProbeResult::Success);
        assert_eq!(action.devices.len(), 1);
        assert_eq!(action.devices[0].name, "BAT0");

        action.apply(Profile::PowerSaver).unwrap();
        let written = crate::sysfs::read_attr(class.join("BAT0").join("charge_type")).unwrap();
        assert_eq!(written, "Trickle");

        std::env::remove_var("UMOCKDEV_DIR");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
