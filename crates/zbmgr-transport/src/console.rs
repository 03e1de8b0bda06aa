use std::io::Read;
use std::os::fd::{AsRawFd, RawFd};

/// The operator console.
///
/// Reads go straight to the descriptor: a buffered `Stdin` would hide bytes
/// from the readiness poll.
#[derive(Debug)]
pub struct Console {
    fd: RawFd,
}

impl Console {
    /// The process's standard input.
    pub fn stdin() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
        }
    }
}

impl Read for Console {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        // SAFETY: `buf` is a valid writable region of `buf.len()` bytes and
        // `self.fd` is the process's stdin, which stays open for its lifetime.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast::<libc::c_void>(), buf.len()) };
        if n < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

impl AsRawFd for Console {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_wraps_stdin_descriptor() {
        assert_eq!(Console::stdin().as_raw_fd(), 0);
    }
}
