//! PTY endpoint implementation
//!
//! This module provides [`PtyBridge`], which allocates a pseudo-terminal,
//! publishes its slave side at a stable path and writes sentences to the
//! master side.

use crate::error::{PtyError, Result};

use spipty_core::nmea::Sentence;

use nix::fcntl::{fcntl, FcntlArg, OFlag};

use std::fs::{self, File, Permissions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

/// Mode applied to the slave device so any consumer can open it
pub const SLAVE_MODE: u32 = 0o666;

/// A pty pair whose slave is reachable through a symlink
///
/// The slave descriptor is held open for the lifetime of the bridge so the
/// master never sees a hangup while no consumer has the device open.
/// The master is non-blocking: once the line discipline is full, writes
/// fail with [`io::ErrorKind::WouldBlock`] instead of stalling the caller.
/// Dropping the bridge closes both sides; the symlink is left in place and
/// replaced on the next [`PtyBridge::open`].
#[derive(Debug)]
pub struct PtyBridge {
    /// Master side, written by the bridge
    master: File,
    /// Slave side, kept open
    _slave: OwnedFd,
    /// OS-assigned slave device, e.g. `/dev/pts/3`
    slave_path: PathBuf,
    /// Stable path consumers open
    link_path: PathBuf,
}

impl PtyBridge {
    /// Allocate a pty and link `path` to its slave device
    ///
    /// Any existing entry at `path` is removed first; a missing one is not an
    /// error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let link_path = path.as_ref().to_path_buf();

        let pty = nix::pty::openpty(None, None).map_err(|e| PtyError::OpenFailed(e.into()))?;
        set_nonblocking(&pty.master).map_err(|e| PtyError::NonBlocking(e.into()))?;
        let slave_path =
            nix::unistd::ttyname(&pty.slave).map_err(|e| PtyError::SlaveName(e.into()))?;
        log::debug!("pty: Allocated {}", slave_path.display());

        match fs::remove_file(&link_path) {
            Ok(()) => log::debug!("pty: Removed stale {}", link_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(PtyError::RemoveFailed {
                    path: link_path,
                    source,
                })
            }
        }

        symlink(&slave_path, &link_path).map_err(|source| PtyError::LinkFailed {
            path: link_path.clone(),
            target: slave_path.clone(),
            source,
        })?;

        fs::set_permissions(&slave_path, Permissions::from_mode(SLAVE_MODE)).map_err(
            |source| PtyError::PermissionsFailed {
                path: slave_path.clone(),
                source,
            },
        )?;

        log::info!(
            "pty: {} -> {}",
            link_path.display(),
            slave_path.display()
        );

        Ok(Self {
            master: File::from(pty.master),
            _slave: pty.slave,
            slave_path,
            link_path,
        })
    }

    /// Write one sentence to the master side and flush it
    ///
    /// Fails with a [`io::ErrorKind::WouldBlock`] write error while no
    /// consumer is draining the slave.
    pub fn emit(&mut self, sentence: &Sentence) -> Result<()> {
        self.write_all(sentence.as_bytes())
            .and_then(|_| self.flush())
            .map_err(PtyError::WriteFailed)
    }

    /// Release both sides of the pty
    pub fn close(self) {
        log::debug!("pty: Closing {}", self.slave_path.display());
    }

    /// OS-assigned slave device path
    pub fn slave_path(&self) -> &Path {
        &self.slave_path
    }

    /// Stable path consumers open
    pub fn link_path(&self) -> &Path {
        &self.link_path
    }
}

fn set_nonblocking(fd: &OwnedFd) -> nix::Result<()> {
    let flags = OFlag::from_bits_truncate(fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?);
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}

impl Write for PtyBridge {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.master.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.master.flush()
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use spipty_core::nmea::validate;
    use std::io::{BufRead, BufReader};

    fn temp_link(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("spipty-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_open_links_slave() {
        let link = temp_link("link");
        let pty = PtyBridge::open(&link).unwrap();

        assert_eq!(fs::read_link(&link).unwrap(), pty.slave_path());
        assert_eq!(pty.link_path(), link.as_path());
        let mode = fs::metadata(pty.slave_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, SLAVE_MODE);

        pty.close();
        fs::remove_file(&link).unwrap();
    }

    #[test]
    fn test_open_replaces_existing_entry() {
        let link = temp_link("stale");
        fs::write(&link, b"stale").unwrap();

        let pty = PtyBridge::open(&link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), pty.slave_path());

        // and again, over our own symlink
        let second = PtyBridge::open(&link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), second.slave_path());
        assert_ne!(pty.slave_path(), second.slave_path());

        fs::remove_file(&link).unwrap();
    }

    #[test]
    fn test_emit_reaches_consumer() {
        let link = temp_link("emit");
        let mut pty = PtyBridge::open(&link).unwrap();

        let sentence = validate(b"$GPAAA,1,2*55\r").unwrap();
        pty.emit(&sentence).unwrap();
        pty.emit(&sentence).unwrap();

        let consumer = File::options().read(true).open(&link).unwrap();
        let mut reader = BufReader::new(consumer);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "$GPAAA,1,2*55\n");

        fs::remove_file(&link).unwrap();
    }

    #[test]
    fn test_emit_without_consumer_does_not_block() {
        let link = temp_link("stalled");
        let mut pty = PtyBridge::open(&link).unwrap();
        let sentence = validate(b"$GPAAA,1,2*55").unwrap();

        // Far more than the line discipline buffers
        let stalled = (0..20_000).find_map(|_| pty.emit(&sentence).err());
        match stalled {
            Some(PtyError::WriteFailed(e)) => assert_eq!(e.kind(), io::ErrorKind::WouldBlock),
            other => panic!("expected a would-block write error, got {:?}", other),
        }

        fs::remove_file(&link).unwrap();
    }
}
