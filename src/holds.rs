// SPDX-License-Identifier: GPL-3.0-only

//! Hold table (spec §3, §4.9): cookie -> `{profile, reason, application_id,
//! requester_bus_name}`. The cookie doubles as the identifier used to recognize the
//! requester's bus name vanishing; the manager owns one `NameOwnerChanged` subscription
//! and matches vanished names against this table rather than installing a separate
//! per-hold watch (zbus has no per-name watch primitive analogous to the source's
//! `g_bus_watch_name`).

use crate::profile::Profile;
use std::collections::BTreeMap;

/// Which published interface a hold was created against, so `ProfileReleased` is
/// emitted back on the same one (spec §4.11).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusInterface {
    Current,
    Legacy,
}

#[derive(Debug, Clone)]
pub struct Hold {
    pub profile: Profile,
    pub reason: String,
    pub application_id: String,
    pub requester: String,
    pub interface: BusInterface,
}

#[derive(Debug, Default)]
pub struct HoldTable {
    holds: BTreeMap<u32, Hold>,
    next_cookie: u32,
}

impl HoldTable {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.holds.is_empty() }

    pub fn get(&self, cookie: u32) -> Option<&Hold> { self.holds.get(&cookie) }

    /// Inserts a new hold and returns its cookie. Cookies are monotonically
    /// increasing and therefore unique among live holds (spec §3 invariant).
    pub fn insert(&mut self, hold: Hold) -> u32 {
        let cookie = self.next_cookie;
        self.next_cookie = self.next_cookie.wrapping_add(1);
        self.holds.insert(cookie, hold);
        cookie
    }

    pub fn remove(&mut self, cookie: u32) -> Option<Hold> { self.holds.remove(&cookie) }

    /// Removes and returns every hold whose requester matches `bus_name`, for a
    /// `NameOwnerChanged` vanish event (spec §8 invariant 5).
    pub fn remove_by_requester(&mut self, bus_name: &str) -> Vec<(u32, Hold)> {
        let cookies: Vec<u32> =
            self.holds.iter().filter(|(_, h)| h.requester == bus_name).map(|(&c, _)| c).collect();
        cookies.into_iter().filter_map(|c| self.holds.remove(&c).map(|h| (c, h))).collect()
    }

    pub fn clear(&mut self) -> Vec<(u32, Hold)> { std::mem::take(&mut self.holds).into_iter().collect() }

    /// Effective hold profile (spec §4.10): `power-saver` if any hold asks for it,
    /// otherwise the (necessarily uniform) `performance` profile of the remaining
    /// holds. Returns `None` if the table is empty.
    pub fn effective_hold_profile(&self) -> Option<Profile> {
        if self.holds.values().any(|h| h.profile == Profile::PowerSaver) {
            return Some(Profile::PowerSaver);
        }
        self.holds.values().next().map(|h| h.profile)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &Hold)> { self.holds.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(profile: Profile, requester: &str) -> Hold {
        Hold {
            profile,
            reason: "test".into(),
            application_id: "org.test.App".into(),
            requester: requester.into(),
            interface: BusInterface::Current,
        }
    }

    #[test]
    fn cookies_are_unique_and_increasing() {
        let mut table = HoldTable::new();
        let a = table.insert(hold(Profile::Performance, ":1.1"));
        let b = table.insert(hold(Profile::PowerSaver, ":1.2"));
        assert_ne!(a, b);
    }

    #[test]
    fn effective_profile_prefers_power_saver() {
        let mut table = HoldTable::new();
        table.insert(hold(Profile::Performance, ":1.1"));
        table.insert(hold(Profile::PowerSaver, ":1.2"));
        assert_eq!(table.effective_hold_profile(), Some(Profile::PowerSaver));
    }

    #[test]
    fn remove_by_requester_only_removes_that_bus_names_holds() {
        let mut table = HoldTable::new();
        let a = table.insert(hold(Profile::Performance, ":1.1"));
        let b = table.insert(hold(Profile::PowerSaver, ":1.2"));
        let removed = table.remove_by_requester(":1.1");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, a);
        assert!(table.get(a).is_none());
        assert!(table.get(b).is_some());
    }

    #[test]
    fn clear_empties_the_table() {
        let mut table = HoldTable::new();
        table.insert(hold(Profile::Performance, ":1.1"));
        let cleared = table.clear();
        assert_eq!(cleared.len(), 1);
        assert!(table.is_empty());
    }
}
