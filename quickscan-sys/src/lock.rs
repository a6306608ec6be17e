// SPDX-License-Identifier: GPL-3.0-only

//! Exclusive-open lock probe
//!
//! The kernel refuses an `O_EXCL` open of a block device while anything else
//! (a mounted filesystem, device-mapper, a running daemon) holds it.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tracing::{debug, info};

pub trait LockProbe: Send + Sync {
    /// True when the device cannot be opened exclusively
    fn is_locked(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusiveOpenProbe;

impl LockProbe for ExclusiveOpenProbe {
    fn is_locked(&self, path: &Path) -> bool {
        info!("checking {} is not locked", path.display());

        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            return true;
        };

        let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDWR | libc::O_EXCL | libc::O_CLOEXEC) };
        if fd < 0 {
            debug!(
                "exclusive open of {} failed: {}",
                path.display(),
                std::io::Error::last_os_error()
            );
            return true;
        }

        if unsafe { libc::close(fd) } != 0 {
            debug!(
                "close of {} failed: {}",
                path.display(),
                std::io::Error::last_os_error()
            );
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_counts_as_locked() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ExclusiveOpenProbe.is_locked(&dir.path().join("no-such-device")));
    }

    #[test]
    fn regular_file_opens_exclusively() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(!ExclusiveOpenProbe.is_locked(file.path()));
    }
}
