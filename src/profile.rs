// SPDX-License-Identifier: GPL-3.0-only

//! The [`Profile`] value type shared by every other component: drivers declare which
//! variants they support, the manager arbitrates between them, and the bus surface
//! serializes them to their wire nick.

use std::fmt;

/// One of the three real power profiles, plus the `unset` sentinel used internally
/// (never observable on the bus) for "nothing selected yet".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Profile {
    PowerSaver,
    Balanced,
    Performance,
    Unset,
}

impl Profile {
    /// The three real variants, in the order the bus surface advertises them.
    pub const ALL: [Profile; 3] = [Profile::PowerSaver, Profile::Balanced, Profile::Performance];

    pub fn to_str(self) -> &'static str {
        match self {
            Profile::PowerSaver => "power-saver",
            Profile::Balanced => "balanced",
            Profile::Performance => "performance",
            Profile::Unset => "unset",
        }
    }

    /// Unknown input yields [`Profile::Unset`], per spec: `from_str` never fails.
    pub fn from_str(s: &str) -> Self {
        match s {
            "power-saver" => Profile::PowerSaver,
            "balanced" => Profile::Balanced,
            "performance" => Profile::Performance,
            _ => Profile::Unset,
        }
    }

    /// True iff this is one of the three real variants (not `unset`).
    pub fn has_single_flag(self) -> bool { self != Profile::Unset }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.to_str()) }
}

impl Default for Profile {
    fn default() -> Self { Profile::Balanced }
}

/// A bitset over the three real profiles; backs `supported_profiles` declarations and
/// the `PROFILE_ALL` mask used to validate them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ProfileMask(u8);

const POWER_SAVER_BIT: u8 = 0b001;
const BALANCED_BIT: u8 = 0b010;
const PERFORMANCE_BIT: u8 = 0b100;

impl ProfileMask {
    pub const EMPTY: ProfileMask = ProfileMask(0);
    pub const ALL: ProfileMask = ProfileMask(POWER_SAVER_BIT | BALANCED_BIT | PERFORMANCE_BIT);

    pub fn from_profiles(profiles: &[Profile]) -> Self {
        let mut mask = 0u8;
        for &p in profiles {
            mask |= bit_for(p);
        }
        ProfileMask(mask)
    }

    pub fn contains(self, profile: Profile) -> bool {
        profile.has_single_flag() && self.0 & bit_for(profile) != 0
    }

    pub fn is_empty(self) -> bool { self.0 == 0 }

    pub fn intersects(self, other: ProfileMask) -> bool { self.0 & other.0 != 0 }

    pub fn union(self, other: ProfileMask) -> ProfileMask { ProfileMask(self.0 | other.0) }

    /// All real variants this mask advertises, in canonical order.
    pub fn iter(self) -> impl Iterator<Item = Profile> {
        Profile::ALL.into_iter().filter(move |&p| self.contains(p))
    }
}

fn bit_for(profile: Profile) -> u8 {
    match profile {
        Profile::PowerSaver => POWER_SAVER_BIT,
        Profile::Balanced => BALANCED_BIT,
        Profile::Performance => PERFORMANCE_BIT,
        Profile::Unset => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_real_variants() {
        for &p in &Profile::ALL {
            assert_eq!(Profile::from_str(p.to_str()), p);
        }
    }

    #[test]
    fn unknown_string_is_unset() {
        assert_eq!(Profile::from_str("quiet"), Profile::Unset);
        assert_eq!(Profile::from_str(""), Profile::Unset);
    }

    #[test]
    fn has_single_flag_excludes_unset() {
        assert!(Profile::Balanced.has_single_flag());
        assert!(!Profile::Unset.has_single_flag());
    }

    #[test]
    fn mask_tracks_membership() {
        let mask = ProfileMask::from_profiles(&[Profile::Balanced, Profile::PowerSaver]);
        assert!(mask.contains(Profile::Balanced));
        assert!(mask.contains(Profile::PowerSaver));
        assert!(!mask.contains(Profile::Performance));
        assert!(mask.intersects(ProfileMask::ALL));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![Profile::PowerSaver, Profile::Balanced]);
    }
}
