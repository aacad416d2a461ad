use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use autorund::config::Config;
use autorund::mounts::MountEntry;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Write an executable shell script and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Config pointing every external program at scripts under `dir`, with a
/// short stop grace so tests do not sit through the production timeout.
///
/// The robot script records its pid, working directory and media root into
/// the drive it runs from; the update script records its pid and argument
/// into the drive it is handed; the hub script appends its argument line
/// to `hub.log` next to the scripts.
pub fn test_config(dir: &Path) -> Config {
    Config {
        robot_program: write_script(
            dir,
            "robot-run",
            "echo x >> starts\necho $$ > pid\npwd > cwd\necho \"$ROBOT_MEDIA_ROOT\" > media_root\nexec sleep 60",
        ),
        update_program: write_script(
            dir,
            "robot-update",
            "echo \"$1\" > \"$1/arg\"\necho $$ > \"$1/pid\"\nexec sleep 60",
        ),
        uhubctl_program: write_script(
            dir,
            "uhubctl",
            &format!("echo \"$@\" >> \"{}\"", dir.join("hub.log").display()),
        ),
        stop_grace_ms: 500,
        ..Config::default()
    }
}

pub fn entry(mountpoint: &Path, fstype: &str) -> MountEntry {
    MountEntry {
        mountpoint: mountpoint.to_path_buf(),
        fstype: fstype.to_string(),
    }
}

pub fn wait_for<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

/// Wait until `path` exists with non-empty content and return it trimmed.
/// Redirection creates the file before the script writes, so existence
/// alone is not enough.
pub fn wait_for_content(path: &Path) -> String {
    assert!(
        wait_for(
            || fs::read_to_string(path)
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false),
            Duration::from_secs(5)
        ),
        "no content appeared in {}",
        path.display()
    );
    fs::read_to_string(path).unwrap().trim().to_string()
}

/// Wait until `path` holds a parseable pid and return it.
pub fn wait_for_pid(path: &Path) -> Pid {
    Pid::from_raw(wait_for_content(path).parse().unwrap())
}

pub fn pid_alive(pid: Pid) -> bool {
    kill(pid, None).is_ok()
}

/// Process state letter from `/proc/<pid>/stat`, `None` once the pid is gone.
pub fn proc_state(pid: Pid) -> Option<char> {
    let stat = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // the state field follows the parenthesized comm
    stat.rsplit(") ").next()?.chars().next()
}
