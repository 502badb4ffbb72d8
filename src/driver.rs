// SPDX-License-Identifier: GPL-3.0-only

//! The `Driver` capability (spec §4.4). The original class hierarchy
//! (`Driver` -> `CpuDriver`/`PlatformDriver` -> concrete types) becomes a single trait
//! plus a `DriverKind` discriminant the manager dispatches on (design notes §9).

use crate::errors::DriverError;
use crate::profile::{Profile, ProfileMask};
use tokio::sync::mpsc;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DriverKind {
    Cpu,
    Platform,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProbeResult {
    Success,
    Fail,
    /// Keep the instance alive; it will send [`DriverEvent::ProbeRequest`] later.
    Defer,
}

/// Why `activate` is being called; informational, drivers may use it to suppress
/// no-op writes or pick a more aggressive side effect for user-driven transitions.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ActivationReason {
    Internal,
    Reset,
    User,
    Resume,
    ProgramHold,
}

/// Events a driver pushes to the manager outside of a direct method call, replacing
/// the source's signal-handler model with a typed channel (design notes §9).
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// Firmware/kernel changed the active profile out of band.
    ProfileChanged(Profile),
    /// A deferred driver's capability may now be present; re-run discovery.
    ProbeRequest,
    /// `performance_degraded` changed; empty string clears it.
    DegradedChanged(String),
}

/// A driver realizes a [`Profile`] by writing kernel or firmware controls. At most one
/// driver of each [`DriverKind`] is selected at a time (spec §3).
pub trait Driver: Send {
    fn name(&self) -> &'static str;

    fn kind(&self) -> DriverKind;

    /// Non-empty subset of the three real profiles; must intersect `ProfileMask::ALL`
    /// on the kinds that can supply `balanced`/`power-saver` (checked by the caller).
    fn supported_profiles(&self) -> ProfileMask;

    /// Idempotent; must not block more than briefly.
    fn probe(&mut self) -> ProbeResult;

    /// Writes whatever realizes `profile`. Drivers that can fail partway through
    /// multiple control files are expected to roll back internally before returning
    /// `Err`, per spec §4.4's CPU driver description.
    fn activate(&mut self, profile: Profile, reason: ActivationReason) -> Result<(), DriverError>;

    /// Current degraded-reason token, or empty if running at full advertised
    /// capability. Only meaningful for drivers whose `supported_profiles` includes
    /// `performance`.
    fn performance_degraded(&self) -> &str { "" }

    /// Registers the channel the driver should push [`DriverEvent`]s to. Called once
    /// after a successful or deferred probe.
    fn subscribe(&mut self, _events: mpsc::UnboundedSender<DriverEvent>) {}

    /// Polls for an out-of-band change (firmware hotkey, another tool writing the
    /// underlying control file) and pushes a [`DriverEvent`] if one occurred. Called
    /// periodically by the daemon's event loop; a no-op for drivers with nothing to
    /// watch. Needed as a trait method (rather than an inherent one on a concrete
    /// driver type) because the manager only ever holds drivers as `Box<dyn Driver>`.
    fn poll_external_change(&mut self) {}
}

/// Validates a driver's declared capability set against spec §4.4/§9's
/// "reject invalid `supported_profiles`" discovery step.
pub fn validate_supported_profiles(name: &'static str, mask: ProfileMask) -> Result<(), DriverError> {
    if mask.is_empty() {
        return Err(DriverError::EmptySupportedProfiles { name });
    }
    Ok(())
}
