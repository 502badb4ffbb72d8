// SPDX-License-Identifier: GPL-3.0-only

//! Test-only helpers shared across unit test modules.
//!
//! `cargo test` runs tests from a single process across multiple threads, and several
//! modules exercise `UMOCKDEV_DIR`/`POWER_PROFILE_DAEMON_*` by mutating those env vars
//! directly (there is no per-thread environment). Without serialization, one test's
//! `remove_var` can race another test's `set_var` and make both observe the wrong root.
//! [`lock_env`] gives every such test a single process-wide gate to hold for the
//! duration of its env-var-dependent section.

use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Acquires the shared env-var test lock. Must be held for as long as the calling
/// test's `UMOCKDEV_DIR`/`POWER_PROFILE_DAEMON_*` overrides are in effect.
pub(crate) fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
