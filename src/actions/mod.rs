// SPDX-License-Identifier: GPL-3.0-only

pub mod amdgpu_panel_power;
pub mod fake;
pub mod trickle_charge;
