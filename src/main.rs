// SPDX-License-Identifier: GPL-3.0-only

use clap::Parser;
use power_profiles_manager::daemon::{self, StartupOptions};

/// Arbitrates power profiles over the system message bus.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Lower the effective log threshold to debug.
    #[arg(long)]
    verbose: bool,

    /// Request replacement of an existing instance on the bus.
    #[arg(long)]
    replace: bool,
}

fn main() {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build the tokio runtime");

    let result = runtime.block_on(daemon::run(StartupOptions { verbose: cli.verbose, replace: cli.replace }));

    if let Err(err) = result {
        eprintln!("power-profiles-managerd: {err:#}");
        std::process::exit(1);
    }
}
