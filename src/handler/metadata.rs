use std::path::Path;

use anyhow::Result;
use tracing::debug;

/// Metadata drives carry peripheral descriptions but run nothing; tracking
/// one only keeps the path from being re-classified every cycle.
pub struct MetadataHandler;

impl MetadataHandler {
    pub fn new() -> Self {
        MetadataHandler
    }

    pub fn start(&mut self, mountpoint: &Path) -> Result<()> {
        debug!("tracking metadata drive at {}", mountpoint.display());
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Default for MetadataHandler {
    fn default() -> Self {
        MetadataHandler::new()
    }
}
