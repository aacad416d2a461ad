use std::fmt;
use std::path::Path;

use crate::config::Config;
use crate::mounts::MountEntry;

/// Purpose of a removable drive, derived from marker files at its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveKind {
    Robot,
    Update,
    Metadata,
    NotOfInterest,
}

impl fmt::Display for DriveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriveKind::Robot => "robot",
            DriveKind::Update => "update",
            DriveKind::Metadata => "metadata",
            DriveKind::NotOfInterest => "not-of-interest",
        };
        write!(f, "{s}")
    }
}

/// Pseudo and virtual filesystem types that can never be removable media.
const FORBIDDEN_FSTYPES: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devpts",
    "devtmpfs",
    "efivarfs",
    "fusectl",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "overlay",
    "proc",
    "pstore",
    "ramfs",
    "rpc_pipefs",
    "securityfs",
    "squashfs",
    "sysfs",
    "tmpfs",
    "tracefs",
];

/// Filesystem-type and root filters, applied before classification is
/// even attempted. Total over its input.
pub fn is_viable(entry: &MountEntry) -> bool {
    if entry.mountpoint == Path::new("/") {
        return false;
    }
    !FORBIDDEN_FSTYPES.contains(&entry.fstype.as_str())
}

/// Classify a mountpoint by marker-file presence. First match wins: update
/// bundles outrank robot code, so a drive carrying both is installed, never
/// executed.
pub fn classify(config: &Config, mountpoint: &Path) -> DriveKind {
    if mountpoint.starts_with(&config.root_mirror) {
        return DriveKind::NotOfInterest;
    }
    if mountpoint.join(&config.update_marker).is_file() {
        return DriveKind::Update;
    }
    if mountpoint.join(&config.robot_marker).is_file() {
        return DriveKind::Robot;
    }
    if mountpoint.join(&config.metadata_marker).is_file() {
        return DriveKind::Metadata;
    }
    DriveKind::NotOfInterest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn entry(mountpoint: &Path, fstype: &str) -> MountEntry {
        MountEntry {
            mountpoint: mountpoint.to_path_buf(),
            fstype: fstype.to_string(),
        }
    }

    #[test]
    fn test_forbidden_fstype_never_viable() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("main.py")).unwrap();
        assert!(!is_viable(&entry(dir.path(), "tmpfs")));
        assert!(!is_viable(&entry(dir.path(), "proc")));
        assert!(!is_viable(&entry(dir.path(), "cgroup2")));
        assert!(is_viable(&entry(dir.path(), "vfat")));
        assert!(is_viable(&entry(dir.path(), "ext4")));
    }

    #[test]
    fn test_root_mount_never_viable() {
        assert!(!is_viable(&entry(Path::new("/"), "ext4")));
    }

    #[test]
    fn test_marker_priority_chain() {
        let dir = tempdir().unwrap();
        let config = Config::default();
        assert_eq!(classify(&config, dir.path()), DriveKind::NotOfInterest);
        File::create(dir.path().join(&config.metadata_marker)).unwrap();
        assert_eq!(classify(&config, dir.path()), DriveKind::Metadata);
        File::create(dir.path().join(&config.robot_marker)).unwrap();
        assert_eq!(classify(&config, dir.path()), DriveKind::Robot);
        File::create(dir.path().join(&config.update_marker)).unwrap();
        assert_eq!(classify(&config, dir.path()), DriveKind::Update);
    }

    #[test]
    fn test_update_outranks_robot() {
        let dir = tempdir().unwrap();
        let config = Config::default();
        File::create(dir.path().join(&config.update_marker)).unwrap();
        File::create(dir.path().join(&config.robot_marker)).unwrap();
        assert_eq!(classify(&config, dir.path()), DriveKind::Update);
    }

    #[test]
    fn test_root_mirror_always_ignored() {
        let dir = tempdir().unwrap();
        let config = Config {
            root_mirror: dir.path().to_path_buf(),
            ..Config::default()
        };
        File::create(dir.path().join(&config.update_marker)).unwrap();
        assert_eq!(classify(&config, dir.path()), DriveKind::NotOfInterest);

        let nested = dir.path().join("boot");
        fs::create_dir(&nested).unwrap();
        File::create(nested.join(&config.robot_marker)).unwrap();
        assert_eq!(classify(&config, &nested), DriveKind::NotOfInterest);
    }

    #[test]
    fn test_mirror_prefix_is_component_wise() {
        let dir = tempdir().unwrap();
        let config = Config {
            root_mirror: dir.path().join("root-ro"),
            ..Config::default()
        };
        // sibling sharing a string prefix with the mirror is still media
        let sibling = dir.path().join("root-rootfs");
        fs::create_dir(&sibling).unwrap();
        File::create(sibling.join(&config.robot_marker)).unwrap();
        assert_eq!(classify(&config, &sibling), DriveKind::Robot);
    }
}
