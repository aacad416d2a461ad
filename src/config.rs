use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Daemon configuration. Every field has a built-in default so the daemon
/// runs without a config file; a YAML file can override any subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Mount table source.
    pub mounts_path: PathBuf,
    /// Root-image mirror; mounts at or below it are never autorun media.
    pub root_mirror: PathBuf,
    /// Marker file naming an update bundle drive.
    pub update_marker: String,
    /// Marker file naming a robot code drive.
    pub robot_marker: String,
    /// Marker file naming a peripheral metadata drive.
    pub metadata_marker: String,
    /// Launcher for the robot user program.
    pub robot_program: PathBuf,
    /// Program handed update bundle mountpoints.
    pub update_program: PathBuf,
    /// Milliseconds to wait after SIGTERM before escalating to SIGKILL.
    pub stop_grace_ms: u64,
    /// Hub power-cycling utility.
    pub uhubctl_program: PathBuf,
    /// Hub location argument for the power-cycling utility.
    pub hub_location: String,
    /// Hub port set argument for the power-cycling utility.
    pub hub_ports: String,
    /// Seconds the hub port stays off during a cycle.
    pub hub_cycle_delay_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mounts_path: PathBuf::from("/proc/mounts"),
            root_mirror: PathBuf::from("/mnt/root-ro"),
            update_marker: "update.tar.xz".to_string(),
            robot_marker: "main.py".to_string(),
            metadata_marker: "metadata.json".to_string(),
            robot_program: PathBuf::from("/usr/libexec/autorun/robot-run"),
            update_program: PathBuf::from("/usr/libexec/autorun/robot-update"),
            stop_grace_ms: 5_000,
            uhubctl_program: PathBuf::from("uhubctl"),
            hub_location: "1-1".to_string(),
            hub_ports: "2".to_string(),
            hub_cycle_delay_secs: 2,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, or fall back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => {
                let mut file = File::open(path)
                    .with_context(|| format!("failed to open config file {}", path.display()))?;
                let mut content = String::new();
                file.read_to_string(&mut content)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_yaml::from_str(&content)
                    .with_context(|| format!("failed to parse config file {}", path.display()))
            }
            None => Ok(Config::default()),
        }
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}
