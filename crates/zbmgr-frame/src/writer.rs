use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::builder::{Command, FrameBuilder};
use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and write a complete frame (blocking).
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        if !frame.is_complete() {
            return Err(FrameError::Incomplete);
        }
        let size = frame.payload().len();
        if size > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        frame.encode_into(self.config.escaped, &mut self.buf);
        trace!(
            frame_type = ?frame.frame_type(),
            frame_id = ?frame.frame_id(),
            bytes = self.buf.len(),
            "writing frame"
        );

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Build `command` with `builder` and send it. Returns the frame sent,
    /// so the caller can pick up the frame ID that was drawn.
    pub fn send_command(
        &mut self,
        builder: &mut FrameBuilder,
        command: &Command,
        frame_id: Option<u8>,
    ) -> Result<Frame> {
        let frame = builder.build(command, frame_id)?;
        self.send(&frame)?;
        Ok(frame)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::builder::CommandName;
    use crate::reader::FrameReader;

    fn nd() -> Command {
        Command::local(CommandName::new("ND").unwrap(), None)
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let frame = Frame::from_payload(&[0x08, 0x01, b'N', b'D']).unwrap();

        writer.send(&frame).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, vec![0x7E, 0x00, 0x04, 0x08, 0x01, b'N', b'D', 0x64]);
    }

    #[test]
    fn escapes_by_default_and_not_when_disabled() {
        let frame = Frame::from_payload(&[0x08, 0x13]).unwrap();

        let mut escaped = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        escaped.send(&frame).unwrap();
        assert_eq!(
            escaped.into_inner().into_inner(),
            vec![0x7E, 0x00, 0x02, 0x08, 0x7D, 0x33, 0xE4]
        );

        let cfg = FrameConfig {
            escaped: false,
            ..FrameConfig::default()
        };
        let mut plain = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        plain.send(&frame).unwrap();
        assert_eq!(
            plain.into_inner().into_inner(),
            vec![0x7E, 0x00, 0x02, 0x08, 0x13, 0xE4]
        );
    }

    #[test]
    fn send_command_draws_frame_ids() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let mut builder = FrameBuilder::new();

        let first = writer.send_command(&mut builder, &nd(), None).unwrap();
        let second = writer.send_command(&mut builder, &nd(), None).unwrap();
        let pinned = writer.send_command(&mut builder, &nd(), Some(0x40)).unwrap();

        assert_eq!(first.frame_id(), Some(1));
        assert_eq!(second.frame_id(), Some(2));
        assert_eq!(pinned.frame_id(), Some(0x40));

        let wire = writer.into_inner().into_inner();
        let mut reader = FrameReader::new(Cursor::new(wire));
        for expected in [1, 2, 0x40] {
            assert_eq!(reader.read_frame().unwrap().frame_id(), Some(expected));
        }
    }

    #[test]
    fn payload_too_large_rejected() {
        let cfg = FrameConfig {
            max_payload_size: 3,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        let frame = Frame::from_payload(&[0x08, 0x01, b'N', b'D']).unwrap();

        let err = writer.send(&frame).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 4, max: 3 }));
    }

    #[test]
    fn incomplete_frame_rejected() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer.send(&Frame::new()).unwrap_err();
        assert!(matches!(err, FrameError::Incomplete));
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send_command(&mut FrameBuilder::new(), &nd(), None).unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = FlakyWriter {
            write_error: Some(ErrorKind::Interrupted),
            flush_error: Some(ErrorKind::Interrupted),
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send_command(&mut FrameBuilder::new(), &nd(), None).unwrap();

        assert_eq!(writer.into_inner().data.len(), 8);
    }

    #[test]
    fn handles_would_block_write_and_flush() {
        let writer_impl = FlakyWriter {
            write_error: Some(ErrorKind::WouldBlock),
            flush_error: Some(ErrorKind::WouldBlock),
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send_command(&mut FrameBuilder::new(), &nd(), None).unwrap();

        assert_eq!(writer.into_inner().data.len(), 8);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer
            .send_command(&mut FrameBuilder::new(), &nd(), None)
            .unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails the first write and the first flush with the given kinds.
    struct FlakyWriter {
        write_error: Option<ErrorKind>,
        flush_error: Option<ErrorKind>,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.write_error.take() {
                return Err(std::io::Error::from(kind));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if let Some(kind) = self.flush_error.take() {
                return Err(std::io::Error::from(kind));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
