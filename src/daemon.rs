// SPDX-License-Identifier: GPL-3.0-only

//! Top-level orchestration (spec §4.10 startup sequence, §5 event loop, §6 CLI).
//! Grounded on the teacher's `daemon()` entry point in `daemon/mod.rs`: a
//! `#[tokio::main(flavor = "current_thread")]` function that builds the bus
//! connections, registers the vtables, and runs a cooperative loop until a signal
//! arrives.

use crate::bus::{NetHadessPowerProfiles, UPowerPowerProfiles, CURRENT_NAME, CURRENT_PATH, LEGACY_NAME, LEGACY_PATH};
use crate::driver::DriverEvent;
use crate::errors::StartupError;
use crate::holds::BusInterface;
use crate::manager::{ManagerEvent, ProfileManager};
use anyhow::Context;
use futures_lite::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use zbus::fdo::RequestNameFlags;

pub struct StartupOptions {
    pub verbose: bool,
    pub replace: bool,
}

/// Acquires `name` on `connection`, honoring `--replace` (spec §6): with replace, both
/// `ReplaceExisting` and `AllowReplacement` are requested; without it, only
/// `AllowReplacement` (so a later `--replace` invocation can still take over from us).
async fn acquire_name(connection: &zbus::Connection, name: &'static str, replace: bool) -> Result<(), StartupError> {
    let dbus = zbus::fdo::DBusProxy::new(connection).await?;
    let mut flags = RequestNameFlags::AllowReplacement.into();
    if replace {
        flags |= RequestNameFlags::ReplaceExisting;
    }
    let reply = dbus.request_name(name.try_into().expect("valid bus name"), flags).await?;
    match reply {
        zbus::fdo::RequestNameReply::PrimaryOwner | zbus::fdo::RequestNameReply::AlreadyOwner => Ok(()),
        _ => Err(StartupError::NameLost(name)),
    }
}

pub async fn run(options: StartupOptions) -> anyhow::Result<()> {
    crate::logging::setup(if options.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .context("failed to initialize logging")?;

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel::<ManagerEvent>();
    let mut bare_manager = ProfileManager::new(events_tx);
    let driver_events_rx = bare_manager.take_driver_events();
    let manager = Arc::new(Mutex::new(bare_manager));

    let current_connection =
        zbus::Connection::system().await.context("failed to connect to the system bus")?;
    let legacy_connection =
        zbus::Connection::system().await.context("failed to connect to the system bus")?;

    acquire_name(&current_connection, CURRENT_NAME, options.replace)
        .await
        .context("failed to acquire primary bus name")?;
    acquire_name(&legacy_connection, LEGACY_NAME, options.replace)
        .await
        .context("failed to acquire legacy bus name")?;

    manager.lock().await.startup().await.context("startup discovery failed")?;

    let current_iface = UPowerPowerProfiles { manager: manager.clone(), connection: current_connection.clone() };
    let legacy_iface =
        NetHadessPowerProfiles { manager: manager.clone(), connection: legacy_connection.clone() };

    current_connection
        .object_server()
        .at(CURRENT_PATH, current_iface)
        .await
        .context("failed to serve current interface")?;
    legacy_connection
        .object_server()
        .at(LEGACY_PATH, legacy_iface)
        .await
        .context("failed to serve legacy interface")?;

    let name_watch_connection = current_connection.clone();
    let manager_for_vanish = manager.clone();
    tokio::spawn(async move {
        watch_name_vanish(name_watch_connection, manager_for_vanish).await;
    });

    let manager_for_events = manager.clone();
    tokio::spawn(async move {
        drive_driver_events(driver_events_rx, manager_for_events).await;
    });

    let manager_for_polling = manager.clone();
    tokio::spawn(async move {
        poll_platform_driver_external_changes(manager_for_polling).await;
    });

    let fanout_current_connection = current_connection.clone();
    let fanout_legacy_connection = legacy_connection.clone();
    tokio::spawn(async move {
        fan_out_manager_events(&mut events_rx, &fanout_current_connection, &fanout_legacy_connection).await;
    });

    wait_for_shutdown_signal().await;
    log::info!("shutting down");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let mut int = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("failed to install SIGINT handler");
    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = int.recv() => log::info!("caught SIGINT"),
        _ = term.recv() => log::info!("caught SIGTERM"),
    }
}

/// Relays driver-pushed events (profile-changed, probe-request, degraded-changed) into
/// manager method calls. The receiver is owned by this task, not by the manager behind
/// its `Mutex`: `recv()` awaits indefinitely in steady state, and awaiting it while
/// holding `manager`'s lock would starve every bus method/property that also needs
/// `self.manager.lock()`. The lock is only taken for the brief call each event
/// triggers.
async fn drive_driver_events(
    mut driver_events_rx: tokio::sync::mpsc::UnboundedReceiver<DriverEvent>,
    manager: Arc<Mutex<ProfileManager>>,
) {
    while let Some(event) = driver_events_rx.recv().await {
        match event {
            DriverEvent::ProfileChanged(profile) => {
                manager.lock().await.handle_external_change(profile).await;
            }
            DriverEvent::ProbeRequest => {
                manager.lock().await.restart_profile_drivers().await;
            }
            DriverEvent::DegradedChanged(_) => {
                // The kind is looked up fresh inside the manager; which kind changed
                // doesn't need to travel through the channel.
                manager.lock().await.handle_degraded_changed(crate::driver::DriverKind::Cpu);
                manager.lock().await.handle_degraded_changed(crate::driver::DriverKind::Platform);
            }
        }
    }
}

/// Periodically polls the installed platform driver's watcher for an externally-driven
/// `platform_profile` change (firmware hotkey, or another tool writing the file
/// directly) and forwards it through the driver-event channel as a
/// [`DriverEvent::ProfileChanged`] (spec §4.10 "External change", §8 E2E-4). Nothing
/// else drives the platform driver's `AttrWatcher` once discovery completes, since the
/// watcher lives behind `Box<dyn Driver>` inside the manager and has no task of its
/// own.
async fn poll_platform_driver_external_changes(manager: Arc<Mutex<ProfileManager>>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(500));
    loop {
        interval.tick().await;
        manager.lock().await.poll_platform_external_change();
    }
}

/// Watches `NameOwnerChanged` on the current-interface connection (bus-name vanish
/// detection is bus-wide, not per-interface) and releases holds owned by vanished
/// requesters (spec §4.9, §8 invariant 5).
async fn watch_name_vanish(connection: zbus::Connection, manager: Arc<Mutex<ProfileManager>>) {
    let Ok(dbus_proxy) = zbus::fdo::DBusProxy::new(&connection).await else {
        log::warn!("failed to create DBus proxy for bus-name-vanish watching");
        return;
    };
    let Ok(mut stream) = dbus_proxy.receive_name_owner_changed().await else {
        log::warn!("failed to subscribe to NameOwnerChanged");
        return;
    };

    while let Some(signal) = stream.next().await {
        let Ok(args) = signal.args() else { continue };
        if args.new_owner.is_some() {
            continue;
        }
        let name = args.name.to_string();
        manager.lock().await.release_profiles_for_requester(&name).await;
    }
}

/// Drains [`ManagerEvent`]s and emits the corresponding `PropertiesChanged`/
/// `ProfileReleased` bus signals on both published interfaces (spec §4.11: property
/// changes go out on both; `ProfileReleased` only on the originating one).
async fn fan_out_manager_events(
    events_rx: &mut tokio::sync::mpsc::UnboundedReceiver<ManagerEvent>,
    current_connection: &zbus::Connection,
    legacy_connection: &zbus::Connection,
) {
    while let Some(event) = events_rx.recv().await {
        match event {
            ManagerEvent::ActiveProfileChanged(_) => {
                emit_active_profile_changed(current_connection, legacy_connection).await;
            }
            ManagerEvent::PerformanceDegradedChanged(_) => {
                emit_degraded_changed(current_connection, legacy_connection).await;
            }
            ManagerEvent::HoldsChanged => {
                emit_holds_changed(current_connection, legacy_connection).await;
            }
            ManagerEvent::ProfileReleased { cookie, interface } => {
                let connection = match interface {
                    BusInterface::Current => current_connection,
                    BusInterface::Legacy => legacy_connection,
                };
                let path = match interface {
                    BusInterface::Current => CURRENT_PATH,
                    BusInterface::Legacy => LEGACY_PATH,
                };
                if let Ok(ctx) = zbus::SignalContext::new(connection, path) {
                    match interface {
                        BusInterface::Current => {
                            let _ = UPowerPowerProfiles::profile_released(&ctx, cookie).await;
                        }
                        BusInterface::Legacy => {
                            let _ = NetHadessPowerProfiles::profile_released(&ctx, cookie).await;
                        }
                    }
                }
            }
            ManagerEvent::Discovery => {
                emit_active_profile_changed(current_connection, legacy_connection).await;
                emit_degraded_changed(current_connection, legacy_connection).await;
            }
        }
    }
}

async fn emit_active_profile_changed(current_connection: &zbus::Connection, legacy_connection: &zbus::Connection) {
    if let Ok(iface_ref) = current_connection.object_server().interface::<_, UPowerPowerProfiles>(CURRENT_PATH).await {
        let iface = iface_ref.get().await;
        if let Ok(ctx) = zbus::SignalContext::new(current_connection, CURRENT_PATH) {
            let _ = iface.active_profile_changed(&ctx).await;
            let _ = iface.profiles_changed(&ctx).await;
        }
    }
    if let Ok(iface_ref) = legacy_connection.object_server().interface::<_, NetHadessPowerProfiles>(LEGACY_PATH).await
    {
        let iface = iface_ref.get().await;
        if let Ok(ctx) = zbus::SignalContext::new(legacy_connection, LEGACY_PATH) {
            let _ = iface.active_profile_changed(&ctx).await;
            let _ = iface.profiles_changed(&ctx).await;
        }
    }
}

async fn emit_degraded_changed(current_connection: &zbus::Connection, legacy_connection: &zbus::Connection) {
    if let Ok(iface_ref) = current_connection.object_server().interface::<_, UPowerPowerProfiles>(CURRENT_PATH).await {
        let iface = iface_ref.get().await;
        if let Ok(ctx) = zbus::SignalContext::new(current_connection, CURRENT_PATH) {
            let _ = iface.performance_degraded_changed(&ctx).await;
        }
    }
    if let Ok(iface_ref) = legacy_connection.object_server().interface::<_, NetHadessPowerProfiles>(LEGACY_PATH).await
    {
        let iface = iface_ref.get().await;
        if let Ok(ctx) = zbus::SignalContext::new(legacy_connection, LEGACY_PATH) {
            let _ = iface.performance_degraded_changed(&ctx).await;
        }
    }
}

async fn emit_holds_changed(current_connection: &zbus::Connection, legacy_connection: &zbus::Connection) {
    if let Ok(iface_ref) = current_connection.object_server().interface::<_, UPowerPowerProfiles>(CURRENT_PATH).await {
        let iface = iface_ref.get().await;
        if let Ok(ctx) = zbus::SignalContext::new(current_connection, CURRENT_PATH) {
            let _ = iface.active_profile_holds_changed(&ctx).await;
        }
    }
    if let Ok(iface_ref) = legacy_connection.object_server().interface::<_, NetHadessPowerProfiles>(LEGACY_PATH).await
    {
        let iface = iface_ref.get().await;
        if let Ok(ctx) = zbus::SignalContext::new(legacy_connection, LEGACY_PATH) {
            let _ = iface.active_profile_holds_changed(&ctx).await;
        }
    }
}
