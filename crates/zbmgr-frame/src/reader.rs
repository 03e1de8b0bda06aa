use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::assembler::FrameAssembler;
use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete frames from any `Read` stream.
///
/// Bytes are pushed through a [`FrameAssembler`]; whatever follows a
/// completed frame in the same read is kept for the next call.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    assembler: FrameAssembler,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            assembler: FrameAssembler::with_config(config),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// A frame with a bad checksum is reported as
    /// `Err(FrameError::ChecksumMismatch)`; the reader stays usable and the
    /// next call continues with the following frame.
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            let consumed = self.assembler.feed(&self.buf);
            self.buf.advance(consumed);

            if let Some(frame) = self.assembler.take() {
                frame.verify()?;
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                debug!(state = ?self.assembler.state(), "end of stream");
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes dropped so far while hunting for a delimiter.
    pub fn dropped_bytes(&self) -> u64 {
        self.assembler.dropped_bytes()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.assembler.config()
    }
}
