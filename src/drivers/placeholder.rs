// SPDX-License-Identifier: GPL-3.0-only

//! The placeholder platform driver (spec §4.4): installed iff no real platform driver
//! loaded, so `balanced` and `power-saver` are always available per the invariant in
//! spec §3. It touches no sysfs state at all.

use crate::driver::{ActivationReason, Driver, DriverKind, ProbeResult};
use crate::errors::DriverError;
use crate::profile::{Profile, ProfileMask};

const NAME: &str = "placeholder";

#[derive(Default)]
pub struct PlaceholderPlatformDriver;

impl PlaceholderPlatformDriver {
    pub fn new() -> Self { Self }
}

impl Driver for PlaceholderPlatformDriver {
    fn name(&self) -> &'static str { NAME }

    fn kind(&self) -> DriverKind { DriverKind::Platform }

    fn supported_profiles(&self) -> ProfileMask {
        ProfileMask::from_profiles(&[Profile::Balanced, Profile::PowerSaver])
    }

    fn probe(&mut self) -> ProbeResult { ProbeResult::Success }

    fn activate(&mut self, _profile: Profile, _reason: ActivationReason) -> Result<(), DriverError> {
        Ok(())
    }
}
