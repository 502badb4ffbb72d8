// SPDX-License-Identifier: GPL-3.0-only

//! The profile manager (spec §4.10) — the core: discovery, arbitration, application,
//! event fan-out, persistence. Runs on a single cooperative task (spec §5); every
//! method that mutates state completes a whole transition before returning, so callers
//! never observe a half-applied intermediate.

use crate::action::{Action, ActionProbeResult};
use crate::config::{self, PersistentState};
use crate::driver::{ActivationReason, Driver, DriverEvent, DriverKind, ProbeResult};
use crate::errors::{DriverError, ManagerError};
use crate::holds::{BusInterface, Hold, HoldTable};
use crate::profile::{Profile, ProfileMask};
use crate::registry;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// One entry of the `Profiles` bus property (spec §4.11).
#[derive(Debug, Clone)]
pub struct ProfileDescriptor {
    pub profile: Profile,
    pub cpu_driver: Option<&'static str>,
    pub platform_driver: Option<&'static str>,
}

impl ProfileDescriptor {
    /// `"multiple"` if both kinds advertise it, else the sole advertiser's name.
    pub fn driver_alias(&self) -> &'static str {
        match (self.cpu_driver, self.platform_driver) {
            (Some(_), Some(_)) => "multiple",
            (Some(name), None) | (None, Some(name)) => name,
            (None, None) => "",
        }
    }
}

/// Fan-out of a completed transition or discovery event, consumed by the bus layer to
/// emit `PropertiesChanged`/`ProfileReleased` (spec §4.11).
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    ActiveProfileChanged(Profile),
    PerformanceDegradedChanged(String),
    HoldsChanged,
    ProfileReleased { cookie: u32, interface: BusInterface },
    Discovery,
}

struct Slot<T> {
    installed: Option<T>,
    deferred: Vec<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self { Self { installed: None, deferred: Vec::new() } }
}

pub struct ProfileManager {
    cpu: Slot<Box<dyn Driver>>,
    platform: Slot<Box<dyn Driver>>,
    actions: Vec<Box<dyn Action>>,
    holds: HoldTable,
    active_profile: Profile,
    selected_profile: Profile,
    config_path: PathBuf,
    driver_events_tx: mpsc::UnboundedSender<DriverEvent>,
    driver_events_rx: Option<mpsc::UnboundedReceiver<DriverEvent>>,
    events_tx: mpsc::UnboundedSender<ManagerEvent>,
    /// Latest external profile-changed event seen during an in-flight transition;
    /// applied once the transition completes instead of interleaving (spec §5).
    coalesced_external_change: Option<Profile>,
    in_transition: bool,
}

impl ProfileManager {
    pub fn new(events_tx: mpsc::UnboundedSender<ManagerEvent>) -> Self {
        let (driver_events_tx, driver_events_rx) = mpsc::unbounded_channel();
        Self {
            cpu: Slot::default(),
            platform: Slot::default(),
            actions: Vec::new(),
            holds: HoldTable::new(),
            active_profile: Profile::Balanced,
            selected_profile: Profile::Balanced,
            config_path: config::default_path(),
            driver_events_tx,
            driver_events_rx: Some(driver_events_rx),
            events_tx,
            coalesced_external_change: None,
            in_transition: false,
        }
    }

    pub fn active_profile(&self) -> Profile { self.active_profile }

    pub fn selected_profile(&self) -> Profile { self.selected_profile }

    pub fn holds(&self) -> &HoldTable { &self.holds }

    pub fn performance_degraded(&self) -> String {
        let cpu = self.cpu.installed.as_ref().map(|d| d.performance_degraded()).filter(|s| !s.is_empty());
        let platform =
            self.platform.installed.as_ref().map(|d| d.performance_degraded()).filter(|s| !s.is_empty());
        match (cpu, platform) {
            (Some(a), Some(b)) => format!("{a},{b}"),
            (Some(a), None) => a.to_owned(),
            (None, Some(b)) => b.to_owned(),
            (None, None) => String::new(),
        }
    }

    fn combined_supported(&self) -> ProfileMask {
        let cpu = self.cpu.installed.as_ref().map(|d| d.supported_profiles()).unwrap_or(ProfileMask::EMPTY);
        let platform =
            self.platform.installed.as_ref().map(|d| d.supported_profiles()).unwrap_or(ProfileMask::EMPTY);
        cpu.union(platform)
    }

    pub fn is_available(&self, profile: Profile) -> bool { self.combined_supported().contains(profile) }

    pub fn profile_descriptors(&self) -> Vec<ProfileDescriptor> {
        Profile::ALL
            .into_iter()
            .filter(|&p| self.is_available(p))
            .map(|p| ProfileDescriptor {
                profile: p,
                cpu_driver: self
                    .cpu
                    .installed
                    .as_ref()
                    .filter(|d| d.supported_profiles().contains(p))
                    .map(|d| d.name()),
                platform_driver: self
                    .platform
                    .installed
                    .as_ref()
                    .filter(|d| d.supported_profiles().contains(p))
                    .map(|d| d.name()),
            })
            .collect()
    }

    pub fn action_names(&self) -> Vec<String> { self.actions.iter().map(|a| a.name().to_owned()).collect() }

    /// Hands the driver-event receiver to the caller, once. The returned receiver must
    /// be awaited outside the manager's lock: holding the lock across `recv()` would
    /// park the owning task forever in steady state (no event pending) and starve
    /// every bus method that needs `self.manager.lock()`. Takes the place of an
    /// inherent `next_driver_event` that would otherwise require `&mut self` across
    /// the await.
    pub fn take_driver_events(&mut self) -> mpsc::UnboundedReceiver<DriverEvent> {
        self.driver_events_rx.take().expect("driver event receiver taken more than once")
    }

    /// Polls the installed platform driver for an out-of-band `profile-changed`, per
    /// spec §4.10 "External change" / §8 E2E-4. Called periodically from the daemon's
    /// event loop; a no-op until a platform driver with a watcher is installed.
    pub fn poll_platform_external_change(&mut self) {
        if let Some(driver) = self.platform.installed.as_mut() {
            driver.poll_external_change();
        }
    }

    // ---- startup ----------------------------------------------------------

    /// Runs discovery, restores persisted state, and activates it with
    /// `reason = reset` (spec §4.10 startup steps 3-6).
    pub async fn startup(&mut self) -> Result<(), crate::errors::StartupError> {
        self.discover();
        if !self.has_required_drivers() {
            return Err(crate::errors::StartupError::NoUsableDriver);
        }

        let persisted = config::load(&self.config_path).unwrap_or_else(|err| {
            log::warn!("failed to load persisted state: {err}");
            PersistentState::default()
        });
        self.apply_configuration(&persisted);

        let target = self.active_profile;
        if let Err(err) = self.activate_target_profile(target, ActivationReason::Reset).await {
            log::warn!("failed to apply startup profile {target}: {err}");
        }

        let _ = self.events_tx.send(ManagerEvent::Discovery);
        Ok(())
    }

    fn has_required_drivers(&self) -> bool {
        let has_any = self.cpu.installed.is_some() || self.platform.installed.is_some();
        has_any && self.combined_supported().contains(Profile::Balanced)
            && self.combined_supported().contains(Profile::PowerSaver)
    }

    /// Discovery (spec §4.10 step 3, §4.6): iterate the registry, skip blocked names,
    /// reject invalid capability declarations, probe, and slot the first winner of
    /// each kind.
    fn discover(&mut self) {
        self.cpu = Slot::default();
        self.platform = Slot::default();
        self.actions.clear();

        for ctor in registry::driver_constructors() {
            let mut driver = ctor();
            if registry::is_driver_blocked(driver.name()) {
                continue;
            }
            if crate::driver::validate_supported_profiles(driver.name(), driver.supported_profiles()).is_err()
            {
                continue;
            }
            let slot = match driver.kind() {
                DriverKind::Cpu => &mut self.cpu,
                DriverKind::Platform => &mut self.platform,
            };
            if slot.installed.is_some() {
                continue;
            }
            match driver.probe() {
                ProbeResult::Success => {
                    driver.subscribe(self.driver_events_tx.clone());
                    slot.installed = Some(driver);
                }
                ProbeResult::Defer => {
                    driver.subscribe(self.driver_events_tx.clone());
                    slot.deferred.push(driver);
                }
                ProbeResult::Fail => {}
            }
        }

        for ctor in registry::action_constructors() {
            let mut action = ctor();
            if registry::is_action_blocked(action.name()) {
                continue;
            }
            if action.probe() == ActionProbeResult::Success {
                self.actions.push(action);
            }
        }
    }

    fn apply_configuration(&mut self, persisted: &PersistentState) {
        let cpu_matches = persisted.cpu_driver.as_deref() == self.cpu.installed.as_ref().map(|d| d.name());
        let platform_matches =
            persisted.platform_driver.as_deref() == self.platform.installed.as_ref().map(|d| d.name());

        if !cpu_matches || !platform_matches {
            return;
        }
        if let Some(profile) = persisted.profile.filter(|p| p.has_single_flag() && self.is_available(*p)) {
            self.active_profile = profile;
            self.selected_profile = profile;
        }
    }

    // ---- transitions --------------------------------------------------------

    /// Applies `target` by activating the CPU driver, then the platform driver, then
    /// every action, persisting if `reason` warrants it (spec §4.10).
    pub async fn activate_target_profile(
        &mut self,
        target: Profile,
        reason: ActivationReason,
    ) -> Result<(), ManagerError> {
        self.in_transition = true;
        let result = self.activate_target_profile_inner(target, reason).await;
        self.in_transition = false;

        if let Some(coalesced) = self.coalesced_external_change.take() {
            if coalesced != self.active_profile {
                Box::pin(self.handle_external_change(coalesced)).await;
            }
        }

        result
    }

    async fn activate_target_profile_inner(
        &mut self,
        target: Profile,
        reason: ActivationReason,
    ) -> Result<(), ManagerError> {
        let previous = self.active_profile;

        if let Some(cpu) = &mut self.cpu.installed {
            if cpu.supported_profiles().contains(target) {
                cpu.activate(target, reason).map_err(ManagerError::from)?;
            }
        }

        if let Some(platform) = &mut self.platform.installed {
            if platform.supported_profiles().contains(target) {
                if let Err(err) = platform.activate(target, reason) {
                    if let Some(cpu) = &mut self.cpu.installed {
                        if cpu.supported_profiles().contains(previous) {
                            if let Err(rollback_err) = cpu.activate(previous, ActivationReason::Internal) {
                                log::warn!("failed to roll back cpu driver after platform failure: {rollback_err}");
                            }
                        }
                    }
                    return Err(ManagerError::from(err));
                }
            }
        }

        for action in &mut self.actions {
            if let Err(err) = action.apply(target) {
                log::warn!("action '{}' failed: {err}", action.name());
            }
        }

        self.active_profile = target;
        let _ = self.events_tx.send(ManagerEvent::ActiveProfileChanged(target));

        if matches!(reason, ActivationReason::User | ActivationReason::Internal) {
            self.persist();
        }

        Ok(())
    }

    fn persist(&self) {
        let state = PersistentState {
            cpu_driver: self.cpu.installed.as_ref().map(|d| d.name().to_owned()),
            platform_driver: self.platform.installed.as_ref().map(|d| d.name().to_owned()),
            profile: Some(self.active_profile),
        };
        if let Err(err) = config::save(&self.config_path, &state) {
            log::warn!("failed to persist state: {err}");
        }
    }

    // ---- client-facing operations -------------------------------------------

    /// `SetActiveProfile` (spec §4.10 "User set"). `name` must parse to a real,
    /// available variant.
    pub async fn set_active_profile(&mut self, name: &str) -> Result<(), ManagerError> {
        let target = Profile::from_str(name);
        if !target.has_single_flag() {
            return Err(ManagerError::InvalidProfileName(name.to_owned()));
        }
        if !self.is_available(target) {
            return Err(ManagerError::ProfileUnavailable(target));
        }
        if target == self.active_profile {
            return Ok(());
        }

        if !self.holds.is_empty() {
            let released = self.holds.clear();
            for (cookie, hold) in released {
                let _ = self.events_tx.send(ManagerEvent::ProfileReleased { cookie, interface: hold.interface });
            }
            let _ = self.events_tx.send(ManagerEvent::HoldsChanged);
        }

        self.activate_target_profile(target, ActivationReason::User).await?;
        self.selected_profile = target;
        Ok(())
    }

    /// Driver-originated `profile-changed` (spec §4.10 "External change").
    pub async fn handle_external_change(&mut self, new_profile: Profile) {
        if new_profile == self.active_profile {
            return;
        }
        if self.in_transition {
            self.coalesced_external_change = Some(new_profile);
            return;
        }
        if let Err(err) = self.activate_target_profile(new_profile, ActivationReason::Internal).await {
            log::warn!("failed to apply externally-driven profile change: {err}");
            return;
        }
        self.selected_profile = new_profile;
    }

    /// `performance_degraded` property-notify relay (spec §4.10). Refuses to forward
    /// from a driver that doesn't advertise `performance`.
    pub fn handle_degraded_changed(&self, kind: DriverKind) {
        let advertises_performance = match kind {
            DriverKind::Cpu => self.cpu.installed.as_ref().map(|d| d.supported_profiles().contains(Profile::Performance)),
            DriverKind::Platform => {
                self.platform.installed.as_ref().map(|d| d.supported_profiles().contains(Profile::Performance))
            }
        };
        if advertises_performance != Some(true) {
            return;
        }
        let _ = self.events_tx.send(ManagerEvent::PerformanceDegradedChanged(self.performance_degraded()));
    }

    /// `HoldProfile` (spec §4.10). Authorization is checked by the caller (bus layer)
    /// before this is invoked.
    pub async fn hold_profile(
        &mut self,
        profile: Profile,
        reason: String,
        application_id: String,
        requester: String,
        interface: BusInterface,
    ) -> Result<u32, ManagerError> {
        if profile != Profile::Performance && profile != Profile::PowerSaver {
            return Err(ManagerError::BalancedHoldRejected);
        }
        if !self.is_available(profile) {
            return Err(ManagerError::ProfileUnavailable(profile));
        }

        let cookie = self.holds.insert(Hold { profile, reason, application_id, requester, interface });
        let _ = self.events_tx.send(ManagerEvent::HoldsChanged);

        if let Some(effective) = self.holds.effective_hold_profile() {
            if effective != self.active_profile {
                self.activate_target_profile(effective, ActivationReason::ProgramHold).await?;
            }
        }

        Ok(cookie)
    }

    /// `ReleaseProfile` (spec §4.10).
    pub async fn release_profile(&mut self, cookie: u32) -> Result<(), ManagerError> {
        let hold = self.holds.remove(cookie).ok_or(ManagerError::UnknownCookie(cookie))?;
        let _ = self.events_tx.send(ManagerEvent::ProfileReleased { cookie, interface: hold.interface });
        let _ = self.events_tx.send(ManagerEvent::HoldsChanged);
        self.settle_after_release(hold.profile).await;
        Ok(())
    }

    /// A requester's bus name vanished; releases every hold it held (spec §8
    /// invariant 5).
    pub async fn release_profiles_for_requester(&mut self, bus_name: &str) {
        let removed = self.holds.remove_by_requester(bus_name);
        if removed.is_empty() {
            return;
        }
        let _ = self.events_tx.send(ManagerEvent::HoldsChanged);
        let mut last_profile = Profile::Unset;
        for (cookie, hold) in removed {
            let _ = self.events_tx.send(ManagerEvent::ProfileReleased { cookie, interface: hold.interface });
            last_profile = hold.profile;
        }
        self.settle_after_release(last_profile).await;
    }

    async fn settle_after_release(&mut self, released_profile: Profile) {
        if self.holds.is_empty() {
            if released_profile != self.selected_profile {
                let target = self.selected_profile;
                if let Err(err) = self.activate_target_profile(target, ActivationReason::ProgramHold).await {
                    log::warn!("failed to restore selected profile after release: {err}");
                }
            }
            return;
        }

        if released_profile == self.active_profile {
            if let Some(effective) = self.holds.effective_hold_profile() {
                if effective != self.active_profile {
                    if let Err(err) = self.activate_target_profile(effective, ActivationReason::ProgramHold).await {
                        log::warn!("failed to apply effective hold profile after release: {err}");
                    }
                }
            }
        }
    }

    /// `restart_profile_drivers` (spec §4.10), invoked when a deferred driver pushes
    /// `probe-request`.
    pub async fn restart_profile_drivers(&mut self) {
        let released = self.holds.clear();
        let had_holds = !released.is_empty();
        for (cookie, hold) in released {
            let _ = self.events_tx.send(ManagerEvent::ProfileReleased { cookie, interface: hold.interface });
        }
        if had_holds {
            let _ = self.events_tx.send(ManagerEvent::HoldsChanged);
        }

        self.discover();
        let persisted = config::load(&self.config_path).unwrap_or_default();
        self.apply_configuration(&persisted);

        let target = self.active_profile;
        if let Err(err) = self.activate_target_profile(target, ActivationReason::Reset).await {
            log::warn!("failed to reapply profile after driver restart: {err}");
        }
        let _ = self.events_tx.send(ManagerEvent::Discovery);
    }
}

impl From<DriverError> for ManagerError {
    fn from(err: DriverError) -> Self { ManagerError::Driver(err) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::fake::FakeDriver;

    fn manager_with_fakes() -> (ProfileManager, mpsc::UnboundedReceiver<ManagerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut manager = ProfileManager::new(tx);
        manager.cpu.installed = Some(Box::new(FakeDriver::cpu_all()));
        manager.platform.installed = Some(Box::new(FakeDriver::platform_all()));
        manager.active_profile = Profile::Balanced;
        manager.selected_profile = Profile::Balanced;
        (manager, rx)
    }

    #[tokio::test]
    async fn set_active_profile_is_noop_when_already_active() {
        let (mut manager, mut rx) = manager_with_fakes();
        manager.set_active_profile("balanced").await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn set_active_profile_rejects_unset_and_unknown() {
        let (mut manager, _rx) = manager_with_fakes();
        assert!(matches!(
            manager.set_active_profile("unset").await,
            Err(ManagerError::InvalidProfileName(_))
        ));
        assert!(matches!(
            manager.set_active_profile("quiet").await,
            Err(ManagerError::InvalidProfileName(_))
        ));
    }

    #[tokio::test]
    async fn hold_rejects_balanced() {
        let (mut manager, _rx) = manager_with_fakes();
        let err = manager
            .hold_profile(Profile::Balanced, "x".into(), "org.x".into(), ":1.1".into(), BusInterface::Current)
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::BalancedHoldRejected));
    }

    #[tokio::test]
    async fn opposed_holds_bias_toward_power_saver_e2e3() {
        let (mut manager, _rx) = manager_with_fakes();
        let cookie_a = manager
            .hold_profile(
                Profile::Performance,
                "build".into(),
                "org.x.A".into(),
                ":1.1".into(),
                BusInterface::Current,
            )
            .await
            .unwrap();
        manager
            .hold_profile(
                Profile::PowerSaver,
                "low-battery".into(),
                "org.x.B".into(),
                ":1.2".into(),
                BusInterface::Current,
            )
            .await
            .unwrap();
        assert_eq!(manager.active_profile(), Profile::PowerSaver);

        manager.release_profile(cookie_a).await.unwrap();
        assert_eq!(manager.active_profile(), Profile::PowerSaver);
    }

    #[tokio::test]
    async fn user_set_releases_all_holds_e2e3() {
        let (mut manager, mut rx) = manager_with_fakes();
        manager
            .hold_profile(
                Profile::Performance,
                "build".into(),
                "org.x.A".into(),
                ":1.1".into(),
                BusInterface::Current,
            )
            .await
            .unwrap();
        manager
            .hold_profile(
                Profile::PowerSaver,
                "low-battery".into(),
                "org.x.B".into(),
                ":1.2".into(),
                BusInterface::Current,
            )
            .await
            .unwrap();

        manager.set_active_profile("balanced").await.unwrap();
        assert_eq!(manager.active_profile(), Profile::Balanced);
        assert_eq!(manager.selected_profile(), Profile::Balanced);
        assert!(manager.holds().iter().next().is_none());

        let mut released_cookies = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ManagerEvent::ProfileReleased { cookie, .. } = event {
                released_cookies.push(cookie);
            }
        }
        assert_eq!(released_cookies.len(), 2);
    }

    #[tokio::test]
    async fn rollback_on_platform_failure_e2e5() {
        let (mut manager, _rx) = manager_with_fakes();
        manager.active_profile = Profile::Balanced;
        // Force the platform driver to fail its next activate().
        manager.platform.installed = Some(Box::new({
            let mut d = FakeDriver::platform_all();
            d.fail_next_activate = true;
            d
        }));

        let err = manager.set_active_profile("performance").await.unwrap_err();
        assert!(matches!(err, ManagerError::Driver(_)));
        assert_eq!(manager.active_profile(), Profile::Balanced);
    }

    #[tokio::test]
    async fn external_change_updates_selected_profile_e2e4() {
        let (mut manager, _rx) = manager_with_fakes();
        manager.set_active_profile("performance").await.unwrap();
        manager.handle_external_change(Profile::Balanced).await;
        assert_eq!(manager.active_profile(), Profile::Balanced);
        assert_eq!(manager.selected_profile(), Profile::Balanced);
    }

    /// Scratch `UMOCKDEV_DIR` used by the discovery-level tests below, so `startup`
    /// exercises the real registry (the fake driver gated by
    /// `POWER_PROFILE_DAEMON_FAKE_DRIVER`) without touching the real filesystem or a
    /// previous test run's persisted state. Holds the shared env-var test lock for its
    /// whole lifetime, since every method it touches (`UMOCKDEV_DIR`,
    /// `POWER_PROFILE_DAEMON_FAKE_DRIVER`) is process-global.
    struct ScratchRoot(std::path::PathBuf, std::sync::MutexGuard<'static, ()>);

    impl ScratchRoot {
        fn new(tag: &str) -> Self {
            let guard = crate::test_support::lock_env();
            let dir = std::env::temp_dir().join(format!("ppm-manager-{tag}-{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            std::env::set_var("UMOCKDEV_DIR", &dir);
            std::env::set_var("POWER_PROFILE_DAEMON_FAKE_DRIVER", "1");
            Self(dir, guard)
        }
    }

    impl Drop for ScratchRoot {
        fn drop(&mut self) {
            std::env::remove_var("UMOCKDEV_DIR");
            std::env::remove_var("POWER_PROFILE_DAEMON_FAKE_DRIVER");
            let _ = std::fs::remove_dir_all(&self.0);
            // `self.1` (the env lock guard) is dropped after this, releasing the gate.
        }
    }

    #[tokio::test]
    async fn cold_start_with_no_persisted_state_settles_on_balanced_e2e1() {
        let _root = ScratchRoot::new("e2e1");
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut manager = ProfileManager::new(tx);

        manager.startup().await.unwrap();

        assert_eq!(manager.active_profile(), Profile::Balanced);
        assert_eq!(manager.selected_profile(), Profile::Balanced);
        assert!(manager.is_available(Profile::Performance));
        assert!(manager.is_available(Profile::PowerSaver));
    }

    #[tokio::test]
    async fn restart_with_persisted_performance_reapplies_it_e2e2() {
        let root = ScratchRoot::new("e2e2");
        let persisted = PersistentState {
            cpu_driver: Some("fake-cpu".into()),
            platform_driver: Some("fake-platform".into()),
            profile: Some(Profile::Performance),
        };
        config::save(&config::default_path(), &persisted).unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut manager = ProfileManager::new(tx);
        manager.startup().await.unwrap();

        assert_eq!(manager.active_profile(), Profile::Performance);
        assert_eq!(manager.selected_profile(), Profile::Performance);
        drop(root);
    }

    #[tokio::test]
    async fn restart_profile_drivers_tears_down_and_rediscovers_e2e6() {
        let _root = ScratchRoot::new("e2e6");
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut manager = ProfileManager::new(tx);
        manager.startup().await.unwrap();
        manager.set_active_profile("power-saver").await.unwrap();

        // Simulates a deferred driver's capability appearing and pushing
        // `probe-request`: the manager tears down, re-runs discovery, and reapplies
        // the persisted profile rather than whatever was active a moment ago.
        manager.restart_profile_drivers().await;

        assert_eq!(manager.active_profile(), Profile::PowerSaver);
        assert!(manager.holds().iter().next().is_none());
    }
}
