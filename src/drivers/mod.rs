// SPDX-License-Identifier: GPL-3.0-only

pub mod acpi_platform;
pub mod fake;
pub mod intel_pstate;
pub mod placeholder;
