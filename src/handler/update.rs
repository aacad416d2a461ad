use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;

/// Hands an update bundle mountpoint to the external update program. The
/// update program unpacks and applies the bundle and reboots the host on
/// its own; the daemon never waits for it and never force-stops it.
pub struct UpdateHandler {
    program: PathBuf,
    child: Option<Child>,
}

impl UpdateHandler {
    pub fn new(config: &Config) -> Self {
        UpdateHandler {
            program: config.update_program.clone(),
            child: None,
        }
    }

    pub fn start(&mut self, mountpoint: &Path) -> Result<()> {
        info!(
            "starting update program {} for {}",
            self.program.display(),
            mountpoint.display()
        );
        let child = Command::new(&self.program)
            .arg(mountpoint)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| {
                format!(
                    "failed to spawn update program {} for {}",
                    self.program.display(),
                    mountpoint.display()
                )
            })?;
        self.child = Some(child);
        Ok(())
    }

    /// Deliberate no-op: killing an in-progress update could corrupt the
    /// installed package state, so the drive is merely untracked.
    pub fn stop(&mut self) -> Result<()> {
        if self.child.is_some() {
            info!("leaving update program running");
        }
        Ok(())
    }
}
