use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};

use tracing::trace;

/// Anything the reactor can wait on and read raw bytes from.
pub trait ByteSource: Read + AsRawFd {}

impl<T: Read + AsRawFd> ByteSource for T {}

/// An open link to the coordinator. Implements Read + Write.
///
/// This is the fundamental I/O type returned by [`crate::SerialPort::open`]
/// and [`crate::ReplayFile::open`]. Bytes read from it are still escaped.
pub struct SerialStream {
    inner: SerialStreamInner,
}

enum SerialStreamInner {
    Tty(File),
    Replay(File),
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialStreamInner::Tty(file) | SerialStreamInner::Replay(file) => file.read(buf),
        }
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialStreamInner::Tty(file) => file.write(buf),
            SerialStreamInner::Replay(_) => {
                trace!(len = buf.len(), "discarding write to replay source");
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            SerialStreamInner::Tty(file) => file.flush(),
            SerialStreamInner::Replay(_) => Ok(()),
        }
    }
}

impl AsRawFd for SerialStream {
    fn as_raw_fd(&self) -> RawFd {
        match &self.inner {
            SerialStreamInner::Tty(file) | SerialStreamInner::Replay(file) => file.as_raw_fd(),
        }
    }
}

impl SerialStream {
    pub(crate) fn from_tty(file: File) -> Self {
        Self {
            inner: SerialStreamInner::Tty(file),
        }
    }

    pub(crate) fn from_replay(file: File) -> Self {
        Self {
            inner: SerialStreamInner::Replay(file),
        }
    }

    /// True when this stream replays captured bytes instead of talking to a device.
    pub fn is_replay(&self) -> bool {
        matches!(self.inner, SerialStreamInner::Replay(_))
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            SerialStreamInner::Tty(_) => "tty",
            SerialStreamInner::Replay(_) => "replay",
        };
        f.debug_struct("SerialStream")
            .field("type", &kind)
            .field("fd", &self.as_raw_fd())
            .finish()
    }
}
