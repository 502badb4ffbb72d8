// SPDX-License-Identifier: GPL-3.0-only

//! Polkit authorization gate (spec §4.8), generalized from the teacher's
//! `dbus`-crate-era `polkit.rs` onto `zbus`/`zbus_polkit`. Two actions are checked:
//! `<namespace>.switch-profile` and `<namespace>.hold-profile`.

use crate::errors::PolkitError;
use zbus_polkit::policykit1::{AuthorityProxy, CheckAuthorizationFlags, Subject};

pub const NAMESPACE: &str = "org.freedesktop.UPower.PowerProfiles";
pub const ACTION_SWITCH_PROFILE: &str = "org.freedesktop.UPower.PowerProfiles.switch-profile";
pub const ACTION_HOLD_PROFILE: &str = "org.freedesktop.UPower.PowerProfiles.hold-profile";

/// Resolves `sender`'s unix pid via `org.freedesktop.DBus.GetConnectionUnixProcessID`,
/// then asks polkit whether it's authorized for `action_id`. Not cached, per spec §4.8.
pub async fn check_authorization(
    connection: &zbus::Connection,
    sender: &str,
    action_id: &'static str,
) -> Result<(), PolkitError> {
    let dbus_proxy = zbus::fdo::DBusProxy::new(connection).await.map_err(PolkitError::ResolveSender)?;
    let pid = dbus_proxy
        .get_connection_unix_process_id(sender)
        .await
        .map_err(PolkitError::ResolveSender)?;

    let authority = AuthorityProxy::new(connection).await.map_err(PolkitError::Authority)?;
    let subject = Subject::new_for_owner(pid, None, None).map_err(PolkitError::Authority)?;

    let result = authority
        .check_authorization(
            &subject,
            action_id,
            &std::collections::HashMap::new(),
            CheckAuthorizationFlags::AllowUserInteraction.into(),
            "",
        )
        .await
        .map_err(PolkitError::Authority)?;

    if result.is_authorized {
        Ok(())
    } else {
        Err(PolkitError::Denied(action_id))
    }
}
