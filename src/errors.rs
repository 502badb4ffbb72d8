// SPDX-License-Identifier: GPL-3.0-only

//! Error taxonomy, organized by effect rather than by type (spec §7): client-triggered
//! errors carry enough detail to travel back to the caller unchanged; internal-event
//! errors are logged and absorbed by the call sites that receive them.

use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SysfsError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, #[source] source: io::Error },
    #[error("attribute not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, #[source] source: io::Error },
    #[error("failed to watch {path}: {source}")]
    Watch { path: PathBuf, #[source] source: io::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("driver '{name}' declares no supported profiles")]
    EmptySupportedProfiles { name: &'static str },
    #[error("driver '{name}' failed to activate {profile}: {source}")]
    Activation { name: &'static str, profile: crate::profile::Profile, #[source] source: SysfsError },
    #[error("driver '{name}' failed to roll back to {profile}: {source}")]
    Rollback { name: &'static str, profile: crate::profile::Profile, #[source] source: SysfsError },
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("action '{name}' failed: {source}")]
    Apply { name: &'static str, #[source] source: SysfsError },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, #[source] source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, #[source] source: io::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum PolkitError {
    #[error("failed to resolve bus sender: {0}")]
    ResolveSender(zbus::Error),
    #[error("polkit authority call failed: {0}")]
    Authority(zbus::Error),
    #[error("not authorized for action '{0}'")]
    Denied(&'static str),
}

/// Errors raised by [`crate::manager::ProfileManager`] methods that originated from a
/// client request and must therefore be surfaced to that client verbatim (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("'{0}' is not a valid profile name")]
    InvalidProfileName(String),
    #[error("profile '{0}' is not available on this system")]
    ProfileUnavailable(crate::profile::Profile),
    #[error("balanced may not be held")]
    BalancedHoldRejected,
    #[error("unknown hold cookie {0}")]
    UnknownCookie(u32),
    #[error(transparent)]
    Access(#[from] PolkitError),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("no CPU or platform driver advertises both balanced and power-saver")]
    NoUsableDriver,
    #[error("failed to acquire bus name '{0}'")]
    NameLost(&'static str),
    #[error(transparent)]
    Zbus(#[from] zbus::Error),
}
