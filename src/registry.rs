use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::classify::{DriveKind, classify, is_viable};
use crate::config::Config;
use crate::handler::Handler;
use crate::mounts::MountEntry;

/// A mount the registry currently supervises. The kind is fixed when the
/// mount first appears; marker changes on a still-mounted drive do not
/// re-classify it.
struct TrackedMount {
    kind: DriveKind,
    handler: Handler,
}

/// Reconciles the live mount table against the set of supervised mounts,
/// starting handlers for mounts that appeared and stopping handlers for
/// mounts that vanished. At most one handler exists per mountpoint.
pub struct HandlerRegistry {
    config: Config,
    tracked: HashMap<PathBuf, TrackedMount>,
}

impl HandlerRegistry {
    pub fn new(config: Config) -> Self {
        HandlerRegistry {
            config,
            tracked: HashMap::new(),
        }
    }

    /// Drive handler starts and stops from a mount table snapshot.
    ///
    /// A handler `start` failure propagates to the caller and is fatal for
    /// the daemon; `stop` failures are logged and the mount is untracked
    /// regardless. `reconcile(&[])` stops and untracks every mount; it is
    /// the clean-shutdown path. The call is idempotent.
    pub fn reconcile(&mut self, entries: &[MountEntry]) -> Result<()> {
        let viable = self.viable_set(entries);

        let appeared: Vec<PathBuf> = viable
            .keys()
            .filter(|path| !self.tracked.contains_key(*path))
            .cloned()
            .collect();
        for path in appeared {
            let kind = viable[&path];
            let Some(mut handler) = Handler::for_kind(kind, &self.config) else {
                continue;
            };
            info!("mount appeared: {} ({kind})", path.display());
            handler.start(&path).with_context(|| {
                format!("failed to start {kind} handler for {}", path.display())
            })?;
            self.tracked.insert(path, TrackedMount { kind, handler });
        }

        let vanished: Vec<PathBuf> = self
            .tracked
            .keys()
            .filter(|path| !viable.contains_key(*path))
            .cloned()
            .collect();
        for path in vanished {
            if let Some(mut mount) = self.tracked.remove(&path) {
                info!("mount vanished: {} ({})", path.display(), mount.kind);
                if let Err(e) = mount.handler.stop() {
                    warn!("stopping handler for {} failed: {e:#}", path.display());
                }
            }
        }
        Ok(())
    }

    /// Viable mountpoints with their kinds. Already-tracked paths keep the
    /// kind recorded at first sight rather than being re-classified.
    fn viable_set(&self, entries: &[MountEntry]) -> HashMap<PathBuf, DriveKind> {
        let mut viable = HashMap::new();
        for entry in entries {
            if !is_viable(entry) {
                continue;
            }
            let kind = match self.tracked.get(&entry.mountpoint) {
                Some(mount) => mount.kind,
                None => classify(&self.config, &entry.mountpoint),
            };
            if kind == DriveKind::NotOfInterest {
                debug!(
                    "ignoring {} ({})",
                    entry.mountpoint.display(),
                    entry.fstype
                );
                continue;
            }
            viable.insert(entry.mountpoint.clone(), kind);
        }
        viable
    }

    /// Kind recorded for a tracked mountpoint, if any.
    pub fn tracked_kind(&self, path: &Path) -> Option<DriveKind> {
        self.tracked.get(path).map(|mount| mount.kind)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }
}
