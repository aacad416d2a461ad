use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

/// One record of the mount table. Rebuilt on every read; identity is the
/// mountpoint path alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub mountpoint: PathBuf,
    pub fstype: String,
}

/// Handle on the kernel mount table, held open for the daemon's lifetime
/// and released on drop.
pub struct MountTable {
    file: File,
}

impl MountTable {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).with_context(|| {
            format!("failed to open mount table {}", path.as_ref().display())
        })?;
        Ok(MountTable { file })
    }

    /// Snapshot of every currently mounted filesystem, in file order.
    pub fn read(&mut self) -> Result<Vec<MountEntry>> {
        self.file
            .seek(SeekFrom::Start(0))
            .context("failed to rewind mount table")?;
        let mut contents = String::new();
        self.file
            .read_to_string(&mut contents)
            .context("failed to read mount table")?;
        Ok(parse(&contents))
    }

    /// Block until the kernel reports a mount table change or `timeout`
    /// elapses; returns whether a change was observed. An interrupting
    /// signal also reports `false` so the caller can check its shutdown
    /// flag before blocking again.
    pub fn watch(&self, timeout: Option<Duration>) -> Result<bool> {
        let timeout = match timeout {
            Some(t) => PollTimeout::try_from(t).context("watch timeout out of range")?,
            None => PollTimeout::NONE,
        };
        let mut fds = [PollFd::new(
            self.file.as_fd(),
            PollFlags::POLLPRI | PollFlags::POLLERR,
        )];
        match poll(&mut fds, timeout) {
            Ok(0) => Ok(false),
            Ok(_) => Ok(true),
            Err(Errno::EINTR) => Ok(false),
            Err(e) => Err(e).context("poll on mount table failed"),
        }
    }
}

fn parse(contents: &str) -> Vec<MountEntry> {
    contents.lines().filter_map(parse_line).collect()
}

/// Parse one `device mountpoint fstype options dump pass` record.
/// Malformed lines are dropped.
fn parse_line(line: &str) -> Option<MountEntry> {
    let mut fields = line.split_whitespace();
    let _device = fields.next()?;
    let mountpoint = fields.next()?;
    let fstype = fields.next()?;
    fields.next()?;
    Some(MountEntry {
        mountpoint: PathBuf::from(unescape(mountpoint)),
        fstype: fstype.to_string(),
    })
}

/// The kernel writes space, tab, newline and backslash in mount fields as
/// three-digit octal escapes (`\040` and friends).
fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut rest = field;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let esc = rest[pos + 1..].as_bytes();
        if esc.len() >= 3 && esc[..3].iter().all(|b| (b'0'..=b'7').contains(b)) {
            let code =
                (esc[0] - b'0') as u32 * 64 + (esc[1] - b'0') as u32 * 8 + (esc[2] - b'0') as u32;
            // three octal digits stay below 0x200, always a valid char
            out.push(char::from_u32(code).unwrap_or('\\'));
            rest = &rest[pos + 4..];
        } else {
            out.push('\\');
            rest = &rest[pos + 1..];
        }
    }
    out.push_str(rest);
    out
}
