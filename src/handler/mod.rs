mod metadata;
mod robot;
mod update;

pub use metadata::MetadataHandler;
pub use robot::{MEDIA_ROOT_ENV, RobotHandler};
pub use update::UpdateHandler;

use std::path::Path;

use anyhow::Result;

use crate::classify::DriveKind;
use crate::config::Config;

/// Supervisor for one tracked mount. The drive kinds form a closed set, so
/// dispatch is a match over variants rather than an open trait object.
///
/// Lifecycle is `start` once, `stop` once; a stopped handler is retired by
/// the registry, never restarted.
pub enum Handler {
    Robot(RobotHandler),
    Update(UpdateHandler),
    Metadata(MetadataHandler),
}

impl Handler {
    /// Build the handler variant matching a classified drive kind. Returns
    /// `None` for `NotOfInterest`, which the registry filters out before
    /// construction.
    pub fn for_kind(kind: DriveKind, config: &Config) -> Option<Handler> {
        match kind {
            DriveKind::Robot => Some(Handler::Robot(RobotHandler::new(config))),
            DriveKind::Update => Some(Handler::Update(UpdateHandler::new(config))),
            DriveKind::Metadata => Some(Handler::Metadata(MetadataHandler::new())),
            DriveKind::NotOfInterest => None,
        }
    }

    pub fn start(&mut self, mountpoint: &Path) -> Result<()> {
        match self {
            Handler::Robot(h) => h.start(mountpoint),
            Handler::Update(h) => h.start(mountpoint),
            Handler::Metadata(h) => h.start(mountpoint),
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        match self {
            Handler::Robot(h) => h.stop(),
            Handler::Update(h) => h.stop(),
            Handler::Metadata(h) => h.stop(),
        }
    }
}
