//! Transfer channel - the single point where bytes cross into the device.
//!
//! Owns the open hidraw handle. A whole report plan goes out as one
//! vectored write: non-blocking first, one blocking retry if the kernel
//! queue is full, and an exactness check on the byte count. Concurrent
//! senders (animation tasks, direct paints) are serialized by an internal
//! mutex; hidraw gives no atomicity guarantee for interleaved writes.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::path::Path;

use mx_console_core::{DeviceError, Result};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::abi::ReportPlan;

pub struct TransferChannel {
    file: Mutex<File>,
}

impl TransferChannel {
    /// Open the hidraw node read/write in blocking mode.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::from_file(file))
    }

    pub(crate) fn from_file(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }

    /// Write one raw report, e.g. a handshake report.
    pub fn write_report(&self, report: &[u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.write_all(report)?;
        Ok(())
    }

    /// Write a full report plan as one vectored operation.
    ///
    /// Success requires the device to accept exactly `plan.total_len()`
    /// bytes; any other outcome, including a clean partial write, fails the
    /// call. A would-block result gets exactly one blocking retry.
    pub fn send(&self, plan: &ReportPlan) -> Result<()> {
        let file = self.file.lock();
        let fd = file.as_raw_fd();

        let iov: Vec<libc::iovec> = plan
            .reports()
            .iter()
            .map(|report| libc::iovec {
                iov_base: report.as_ptr() as *mut libc::c_void,
                iov_len: report.len(),
            })
            .collect();

        // Try non-blocking so a wedged device can't hang the caller, then
        // restore the original flags before any blocking retry.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
        unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        let mut written = writev(fd, &iov);
        unsafe { libc::fcntl(fd, libc::F_SETFL, flags) };

        if let Err(err) = &written {
            if err.kind() == io::ErrorKind::WouldBlock {
                debug!(reports = plan.count(), "write would block, retrying blocking");
                written = writev(fd, &iov);
            }
        }

        let written = written?;
        let expected = plan.total_len();
        if written != expected {
            return Err(DeviceError::ShortWrite { written, expected });
        }
        trace!(reports = plan.count(), bytes = written, "report plan sent");
        Ok(())
    }
}

fn writev(fd: libc::c_int, iov: &[libc::iovec]) -> io::Result<usize> {
    let ret = unsafe { libc::writev(fd, iov.as_ptr(), iov.len() as libc::c_int) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}
