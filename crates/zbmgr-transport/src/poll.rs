//! Readiness waiting over raw descriptors via `poll(2)`.

use std::io::ErrorKind;
use std::os::fd::RawFd;
use std::time::Duration;

use tracing::trace;

use crate::error::{Result, TransportError};

/// What the caller wants to know about one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    pub fd: RawFd,
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub fn readable(fd: RawFd) -> Self {
        Self {
            fd,
            read: true,
            write: false,
        }
    }

    pub fn read_write(fd: RawFd) -> Self {
        Self {
            fd,
            read: true,
            write: true,
        }
    }
}

/// What `poll(2)` reported for one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub fd: RawFd,
    /// Data is available, or the peer hung up (the next read reports EOF).
    pub readable: bool,
    pub writable: bool,
    /// The descriptor is in an error state or invalid.
    pub error: bool,
}

/// Wait until at least one descriptor is ready or `timeout` elapses.
///
/// Returns only the descriptors with something to report; an empty vector
/// means the wait timed out. Every descriptor is watched for errors whether
/// or not it was registered for reading or writing.
pub fn poll_ready(interests: &[Interest], timeout: Duration) -> Result<Vec<Readiness>> {
    let mut fds: Vec<libc::pollfd> = interests
        .iter()
        .map(|interest| {
            let mut events = 0;
            if interest.read {
                events |= libc::POLLIN;
            }
            if interest.write {
                events |= libc::POLLOUT;
            }
            libc::pollfd {
                fd: interest.fd,
                events,
                revents: 0,
            }
        })
        .collect();

    let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

    loop {
        // SAFETY: `fds` is a live, correctly sized array of `pollfd` for the
        // duration of the call.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                continue;
            }
            return Err(TransportError::Poll(err));
        }
        trace!(ready = rc, "poll returned");
        break;
    }

    Ok(fds
        .iter()
        .filter(|pfd| pfd.revents != 0)
        .map(|pfd| Readiness {
            fd: pfd.fd,
            readable: pfd.revents & (libc::POLLIN | libc::POLLHUP) != 0,
            writable: pfd.revents & libc::POLLOUT != 0,
            error: pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0,
        })
        .collect())
}
