pub mod classify;
pub mod config;
pub mod daemon;
pub mod handler;
pub mod mounts;
pub mod registry;

// re-export selected public API
pub use classify::{DriveKind, classify, is_viable};
pub use config::Config;
pub use mounts::{MountEntry, MountTable};
pub use registry::HandlerRegistry;
