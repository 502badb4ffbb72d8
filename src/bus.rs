// SPDX-License-Identifier: GPL-3.0-only

//! Bus surface (spec §4.11, §6): identical vtables published at
//! `org.freedesktop.UPower.PowerProfiles` and the legacy `net.hadess.PowerProfiles`
//! name/path pair, grounded on the teacher's `UPowerPowerProfiles`/
//! `NetHadessPowerProfiles` wrapper pattern in `daemon/mod.rs`.

use crate::errors::ManagerError;
use crate::holds::BusInterface;
use crate::manager::ProfileManager;
use crate::polkit;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use zvariant::Value;

pub const CURRENT_NAME: &str = "org.freedesktop.UPower.PowerProfiles";
pub const CURRENT_PATH: &str = "/org/freedesktop/UPower/PowerProfiles";
pub const LEGACY_NAME: &str = "net.hadess.PowerProfiles";
pub const LEGACY_PATH: &str = "/net/hadess/PowerProfiles";

fn manager_error_to_fdo(err: ManagerError) -> zbus::fdo::Error {
    match err {
        ManagerError::InvalidProfileName(_)
        | ManagerError::ProfileUnavailable(_)
        | ManagerError::BalancedHoldRejected
        | ManagerError::UnknownCookie(_) => zbus::fdo::Error::InvalidArgs(err.to_string()),
        ManagerError::Access(_) => zbus::fdo::Error::AccessDenied(err.to_string()),
        ManagerError::Driver(_) => zbus::fdo::Error::Failed(err.to_string()),
    }
}

fn profiles_property(manager: &ProfileManager) -> Vec<HashMap<&'static str, Value<'static>>> {
    manager
        .profile_descriptors()
        .into_iter()
        .map(|d| {
            let mut map = HashMap::new();
            map.insert("Profile", Value::from(d.profile.to_str()));
            if let Some(cpu) = d.cpu_driver {
                map.insert("CpuDriver", Value::from(cpu));
            }
            if let Some(platform) = d.platform_driver {
                map.insert("PlatformDriver", Value::from(platform));
            }
            map.insert("Driver", Value::from(d.driver_alias()));
            map
        })
        .collect()
}

fn holds_property(manager: &ProfileManager) -> Vec<HashMap<&'static str, Value<'static>>> {
    manager
        .holds()
        .iter()
        .map(|(_, hold)| {
            let mut map = HashMap::new();
            map.insert("Profile", Value::from(hold.profile.to_str()));
            map.insert("Reason", Value::from(hold.reason.clone()));
            map.insert("ApplicationId", Value::from(hold.application_id.clone()));
            map
        })
        .collect()
}

/// Shared manager handle plus the unix-socket-like bus sender extracted per call by
/// each method via `#[zbus(header)]`.
pub struct UPowerPowerProfiles {
    pub manager: Arc<Mutex<ProfileManager>>,
    pub connection: zbus::Connection,
}

#[zbus::interface(name = "org.freedesktop.UPower.PowerProfiles")]
impl UPowerPowerProfiles {
    #[zbus(property)]
    async fn active_profile(&self) -> String { self.manager.lock().await.active_profile().to_string() }

    #[zbus(property)]
    async fn set_active_profile(
        &mut self,
        #[zbus(header)] header: zbus::message::Header<'_>,
        profile: String,
    ) -> zbus::fdo::Result<()> {
        let sender = header.sender().map(|s| s.to_string()).unwrap_or_default();
        polkit::check_authorization(&self.connection, &sender, polkit::ACTION_SWITCH_PROFILE)
            .await
            .map_err(|err| manager_error_to_fdo(ManagerError::Access(err)))?;
        self.manager.lock().await.set_active_profile(&profile).await.map_err(manager_error_to_fdo)
    }

    #[zbus(property)]
    async fn profiles(&self) -> Vec<HashMap<&'static str, Value<'static>>> {
        profiles_property(&*self.manager.lock().await)
    }

    #[zbus(property)]
    async fn actions(&self) -> Vec<String> { self.manager.lock().await.action_names() }

    #[zbus(property)]
    async fn performance_degraded(&self) -> String { self.manager.lock().await.performance_degraded() }

    #[zbus(property)]
    async fn performance_inhibited(&self) -> String { String::new() }

    #[zbus(property)]
    async fn active_profile_holds(&self) -> Vec<HashMap<&'static str, Value<'static>>> {
        holds_property(&*self.manager.lock().await)
    }

    #[zbus(property)]
    async fn version(&self) -> String { env!("CARGO_PKG_VERSION").to_owned() }

    #[zbus(out_args("cookie"))]
    async fn hold_profile(
        &mut self,
        #[zbus(header)] header: zbus::message::Header<'_>,
        profile: String,
        reason: String,
        application_id: String,
    ) -> zbus::fdo::Result<u32> {
        let sender = header.sender().map(|s| s.to_string()).unwrap_or_default();
        polkit::check_authorization(&self.connection, &sender, polkit::ACTION_HOLD_PROFILE)
            .await
            .map_err(|err| manager_error_to_fdo(ManagerError::Access(err)))?;

        let target = crate::profile::Profile::from_str(&profile);
        self.manager
            .lock()
            .await
            .hold_profile(target, reason, application_id, sender, BusInterface::Current)
            .await
            .map_err(manager_error_to_fdo)
    }

    async fn release_profile(&mut self, cookie: u32) -> zbus::fdo::Result<()> {
        self.manager.lock().await.release_profile(cookie).await.map_err(manager_error_to_fdo)
    }

    #[zbus(signal)]
    async fn profile_released(context: &zbus::SignalContext<'_>, cookie: u32) -> zbus::Result<()>;
}

/// Identical vtable published on the legacy bus name/path, delegating to the same
/// manager (spec §9 Open Question: legacy and current behave identically today).
pub struct NetHadessPowerProfiles {
    pub manager: Arc<Mutex<ProfileManager>>,
    pub connection: zbus::Connection,
}

#[zbus::interface(name = "net.hadess.PowerProfiles")]
impl NetHadessPowerProfiles {
    #[zbus(property)]
    async fn active_profile(&self) -> String { self.manager.lock().await.active_profile().to_string() }

    #[zbus(property)]
    async fn set_active_profile(
        &mut self,
        #[zbus(header)] header: zbus::message::Header<'_>,
        profile: String,
    ) -> zbus::fdo::Result<()> {
        let sender = header.sender().map(|s| s.to_string()).unwrap_or_default();
        polkit::check_authorization(&self.connection, &sender, polkit::ACTION_SWITCH_PROFILE)
            .await
            .map_err(|err| manager_error_to_fdo(ManagerError::Access(err)))?;
        self.manager.lock().await.set_active_profile(&profile).await.map_err(manager_error_to_fdo)
    }

    #[zbus(property)]
    async fn profiles(&self) -> Vec<HashMap<&'static str, Value<'static>>> {
        profiles_property(&*self.manager.lock().await)
    }

    #[zbus(property)]
    async fn actions(&self) -> Vec<String> { self.manager.lock().await.action_names() }

    #[zbus(property)]
    async fn performance_degraded(&self) -> String { self.manager.lock().await.performance_degraded() }

    #[zbus(property)]
    async fn performance_inhibited(&self) -> String { String::new() }

    #[zbus(property)]
    async fn active_profile_holds(&self) -> Vec<HashMap<&'static str, Value<'static>>> {
        holds_property(&*self.manager.lock().await)
    }

    #[zbus(property)]
    async fn version(&self) -> String { env!("CARGO_PKG_VERSION").to_owned() }

    #[zbus(out_args("cookie"))]
    async fn hold_profile(
        &mut self,
        #[zbus(header)] header: zbus::message::Header<'_>,
        profile: String,
        reason: String,
        application_id: String,
    ) -> zbus::fdo::Result<u32> {
        let sender = header.sender().map(|s| s.to_string()).unwrap_or_default();
        polkit::check_authorization(&self.connection, &sender, polkit::ACTION_HOLD_PROFILE)
            .await
            .map_err(|err| manager_error_to_fdo(ManagerError::Access(err)))?;

        let target = crate::profile::Profile::from_str(&profile);
        self.manager
            .lock()
            .await
            .hold_profile(target, reason, application_id, sender, BusInterface::Legacy)
            .await
            .map_err(manager_error_to_fdo)
    }

    async fn release_profile(&mut self, cookie: u32) -> zbus::fdo::Result<()> {
        self.manager.lock().await.release_profile(cookie).await.map_err(manager_error_to_fdo)
    }

    #[zbus(signal)]
    async fn profile_released(context: &zbus::SignalContext<'_>, cookie: u32) -> zbus::Result<()>;
}
