use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{debug, info};

use crate::config::Config;
use crate::mounts::MountTable;
use crate::registry::HandlerRegistry;

/// Run the autorun daemon until an operator interrupt.
///
/// The loop reconciles once at startup, then blocks in `watch()` between
/// reconciliations. SIGINT/SIGTERM interrupt the poll; a final empty
/// reconcile then stops every tracked handler before the daemon exits.
pub fn run(config: Config) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        signal_hook::flag::register(sig, Arc::clone(&shutdown))
            .with_context(|| format!("failed to register handler for signal {sig}"))?;
    }

    let mut table = MountTable::open(&config.mounts_path)?;
    let mut registry = HandlerRegistry::new(config);

    info!("autorun daemon started");
    registry.reconcile(&table.read()?)?;

    while !shutdown.load(Ordering::Relaxed) {
        if table.watch(None)? {
            debug!("mount table changed");
            registry.reconcile(&table.read()?)?;
        }
    }

    info!("interrupt received, stopping all handlers");
    registry.reconcile(&[])?;
    Ok(())
}
