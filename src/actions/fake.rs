// SPDX-License-Identifier: GPL-3.0-only

//! Action test double, gated the same way as [`crate::drivers::fake`].

use crate::action::{Action, ActionProbeResult};
use crate::errors::ActionError;
use crate::profile::Profile;

pub struct FakeAction {
    name: &'static str,
    pub applied: Vec<Profile>,
    pub fail_next_apply: bool,
}

impl FakeAction {
    pub fn new(name: &'static str) -> Self { Self { name, applied: Vec::new(), fail_next_apply: false } }
}

impl Action for FakeAction {
    fn name(&self) -> &'static str { self.name }

    fn probe(&mut self) -> ActionProbeResult { ActionProbeResult::Success }

    fn apply(&mut self, profile: Profile) -> Result<(), ActionError> {
        if self.fail_next_apply {
            self.fail_next_apply = false;
            return Err(ActionError::Apply {
                name: self.name,
                source: crate::errors::SysfsError::NotFound("fake".into()),
            });
        }
        self.applied.push(profile);
        Ok(())
    }
}
