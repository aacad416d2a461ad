use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::config::Config;

/// Environment variable naming the media root for the robot program, so it
/// can discover peripheral metadata on the same drive.
pub const MEDIA_ROOT_ENV: &str = "ROBOT_MEDIA_ROOT";

/// How often the grace wait re-checks the child for exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Supervises the robot user program for one media drive. The program runs
/// as the leader of its own process group so that stop signals also reach
/// whatever it spawned.
pub struct RobotHandler {
    program: PathBuf,
    grace: Duration,
    uhubctl: PathBuf,
    hub_location: String,
    hub_ports: String,
    hub_cycle_delay_secs: u32,
    child: Option<Child>,
}

impl RobotHandler {
    pub fn new(config: &Config) -> Self {
        RobotHandler {
            program: config.robot_program.clone(),
            grace: config.stop_grace(),
            uhubctl: config.uhubctl_program.clone(),
            hub_location: config.hub_location.clone(),
            hub_ports: config.hub_ports.clone(),
            hub_cycle_delay_secs: config.hub_cycle_delay_secs,
            child: None,
        }
    }

    /// Launch the robot program rooted at the media mountpoint. The daemon
    /// does not wait for it to exit.
    pub fn start(&mut self, mountpoint: &Path) -> Result<()> {
        info!(
            "starting robot program {} for {}",
            self.program.display(),
            mountpoint.display()
        );
        let child = Command::new(&self.program)
            .current_dir(mountpoint)
            .env(MEDIA_ROOT_ENV, mountpoint)
            .stdin(Stdio::null())
            .process_group(0)
            .spawn()
            .with_context(|| {
                format!(
                    "failed to spawn robot program {} for {}",
                    self.program.display(),
                    mountpoint.display()
                )
            })?;
        self.child = Some(child);
        Ok(())
    }

    /// Terminate the robot program: SIGTERM to the process group, bounded
    /// grace wait, SIGKILL to the group, then power-cycle the peripheral
    /// hub. A program that already exited is not signaled, but the hub is
    /// cycled regardless.
    pub fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let pgid = Pid::from_raw(child.id() as i32);
        match child
            .try_wait()
            .context("failed to query robot program status")?
        {
            Some(status) => {
                info!("robot program already exited ({status}), skipping signals");
            }
            None => {
                info!("sending SIGTERM to robot process group {pgid}");
                if let Err(e) = killpg(pgid, Signal::SIGTERM) {
                    warn!("SIGTERM to process group {pgid} failed: {e}");
                }
                self.wait_for_exit(&mut child);
                // the group can still hold children even after the leader exits
                match killpg(pgid, Signal::SIGKILL) {
                    Ok(()) | Err(Errno::ESRCH) => {}
                    Err(e) => warn!("SIGKILL to process group {pgid} failed: {e}"),
                }
                let _ = child.wait();
            }
        }
        self.reset_hub();
        Ok(())
    }

    /// Give the program up to the grace period to exit on its own.
    fn wait_for_exit(&self, child: &mut Child) {
        let deadline = Instant::now() + self.grace;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
                Err(e) => {
                    warn!("failed to query robot program status: {e}");
                    return;
                }
            }
        }
        info!("robot program ignored SIGTERM for {:?}", self.grace);
    }

    /// The peripheral loses power mid-exit when its controlling process
    /// dies; cycling the hub port brings it back. Failure is logged and
    /// swallowed so the registry can always retire this handler.
    fn reset_hub(&self) {
        info!(
            "power cycling hub {} port {}",
            self.hub_location, self.hub_ports
        );
        let result = Command::new(&self.uhubctl)
            .args(["-l", &self.hub_location, "-p", &self.hub_ports])
            .args(["-a", "cycle", "-d", &self.hub_cycle_delay_secs.to_string()])
            .stdin(Stdio::null())
            .status();
        match result {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("hub power cycle exited with {status}"),
            Err(e) => warn!(
                "failed to run hub power cycle {}: {e}",
                self.uhubctl.display()
            ),
        }
    }
}
