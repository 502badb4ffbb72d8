// SPDX-License-Identifier: GPL-3.0-only

use fern::{colors::ColoredLevelConfig, Dispatch, InitError};
use log::LevelFilter;
use std::io;

/// Sets up `fern` logging to stderr, honoring the env vars spec.md §6 names:
///
/// - `NO_COLOR`, when set to anything, disables ANSI level coloring.
/// - `G_MESSAGES_DEBUG`, a comma-separated list of module paths (or `all`), raises
///   those modules to debug regardless of `filter`.
pub fn setup(filter: LevelFilter) -> Result<(), InitError> {
    let no_color = std::env::var_os("NO_COLOR").is_some();
    let debug_domains: Vec<String> = std::env::var("G_MESSAGES_DEBUG")
        .map(|v| v.split(',').map(str::trim).map(str::to_owned).collect())
        .unwrap_or_default();
    let debug_all = debug_domains.iter().any(|d| d == "all");

    let colors = ColoredLevelConfig::new();

    Dispatch::new()
        .level(LevelFilter::Off)
        .level_for(env!("CARGO_PKG_NAME").replace('-', "_"), filter)
        .filter(move |metadata| {
            if debug_all {
                return true;
            }
            if debug_domains.iter().any(|d| metadata.target().starts_with(d.as_str())) {
                return true;
            }
            metadata.level() <= filter
        })
        .format(move |out, message, record| {
            if no_color {
                out.finish(format_args!("[{}] {}", record.level(), message))
            } else {
                out.finish(format_args!("[{}] {}", colors.color(record.level()), message))
            }
        })
        .chain(io::stderr())
        .apply()?;

    Ok(())
}
