use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use serde::Serialize;
use tracing::{debug, info, trace, warn};
use zbmgr_frame::{Command, Frame, FrameAssembler, FrameBuilder, FrameConfig, FrameError};
use zbmgr_transport::{poll_ready, ByteSource, Console, Interest, Readiness};

use crate::error::{ReactorError, Result, SourceKind};
use crate::handler::{Dispatch, HandlerTable};

/// How long one readiness wait lasts before a timeout diagnostic.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Reactor configuration.
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    /// Readiness wait per turn. Default: 5 seconds.
    pub poll_timeout: Duration,
    /// Assembly and encoding of frames on the link.
    pub frame: FrameConfig,
    /// Attach stdin as a second readable source. Default: false.
    pub console: bool,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            frame: FrameConfig::default(),
            console: false,
        }
    }
}

/// Counters kept by the reactor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactorStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub frames_completed: u64,
    pub frames_dispatched: u64,
    /// Valid frames no handler took.
    pub frames_unrouted: u64,
    pub checksum_failures: u64,
    /// Bytes discarded while waiting for a delimiter.
    pub dropped_bytes: u64,
    pub timeouts: u64,
}

/// Outcome of one [`Reactor::turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Nothing became ready within the poll timeout.
    TimedOut,
    /// At least one source was serviced.
    Serviced,
}

/// Single-threaded event loop over the coordinator link.
///
/// Each turn waits for readiness on the link (readable, plus writable while
/// outbound bytes are queued) and the optional console, reads exactly one
/// byte from each readable source and feeds it to a shared
/// [`FrameAssembler`]. Completed frames with a good checksum are routed
/// through the [`HandlerTable`]; bad ones are logged and discarded.
///
/// End of stream and error readiness on any source stop the reactor with an
/// error. [`Reactor::run`] also stops, cleanly, when the stop flag is set.
pub struct Reactor<T> {
    link: T,
    console: Option<Box<dyn ByteSource>>,
    assembler: FrameAssembler,
    builder: FrameBuilder,
    handlers: HandlerTable,
    outbound: BytesMut,
    config: ReactorConfig,
    stop: Arc<AtomicBool>,
    stats: ReactorStats,
}

impl<T: Read + Write + AsRawFd> Reactor<T> {
    /// Create a reactor with default configuration.
    pub fn new(link: T) -> Self {
        Self::with_config(link, ReactorConfig::default())
    }

    /// Create a reactor with explicit configuration.
    ///
    /// With `config.console` set, stdin is attached as the console.
    pub fn with_config(link: T, config: ReactorConfig) -> Self {
        let console: Option<Box<dyn ByteSource>> = if config.console {
            Some(Box::new(Console::stdin()))
        } else {
            None
        };
        Self {
            link,
            console,
            assembler: FrameAssembler::with_config(config.frame.clone()),
            builder: FrameBuilder::with_config(&config.frame),
            handlers: HandlerTable::new(),
            outbound: BytesMut::new(),
            config,
            stop: Arc::new(AtomicBool::new(false)),
            stats: ReactorStats::default(),
        }
    }

    /// Use `source` as the console instead of stdin.
    pub fn with_console(mut self, source: impl ByteSource + 'static) -> Self {
        self.console = Some(Box::new(source));
        self
    }

    /// Drop the console source.
    pub fn without_console(mut self) -> Self {
        self.console = None;
        self
    }

    /// Replace the handler table.
    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    /// Share a stop flag with the caller (e.g. a signal handler).
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// The stop flag checked by [`Reactor::run`] between turns.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn handlers(&mut self) -> &mut HandlerTable {
        &mut self.handlers
    }

    /// Queue a complete frame for transmission on the link.
    pub fn queue_frame(&mut self, frame: &Frame) -> Result<()> {
        if !frame.is_complete() {
            return Err(FrameError::Incomplete.into());
        }
        let size = frame.payload().len();
        if size > self.config.frame.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.config.frame.max_payload_size,
            }
            .into());
        }
        frame.encode_into(self.config.frame.escaped, &mut self.outbound);
        debug!(
            frame_type = ?frame.frame_type(),
            frame_id = ?frame.frame_id(),
            pending = self.outbound.len(),
            "queued frame"
        );
        Ok(())
    }

    /// Build `command` and queue it. Returns the frame, so the caller can
    /// register a handler for its frame ID.
    pub fn send_command(&mut self, command: &Command, frame_id: Option<u8>) -> Result<Frame> {
        let frame = self.builder.build(command, frame_id)?;
        self.queue_frame(&frame)?;
        Ok(frame)
    }

    /// Outbound bytes not yet written to the link.
    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    pub fn stats(&self) -> ReactorStats {
        ReactorStats {
            dropped_bytes: self.assembler.dropped_bytes(),
            ..self.stats
        }
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    /// Borrow the link.
    pub fn get_ref(&self) -> &T {
        &self.link
    }

    /// Consume the reactor and return the link.
    pub fn into_inner(self) -> T {
        self.link
    }

    /// Run turns until the stop flag is set or a source fails.
    pub fn run(&mut self) -> Result<()> {
        info!(
            poll_timeout = ?self.config.poll_timeout,
            console = self.console.is_some(),
            escaped = self.config.frame.escaped,
            "reactor started"
        );
        while !self.stop.load(Ordering::SeqCst) {
            if let Err(err) = self.turn() {
                info!(error = %err, "reactor stopped");
                return Err(err);
            }
        }
        info!("reactor stopped");
        Ok(())
    }

    /// Wait for readiness once and service what became ready.
    pub fn turn(&mut self) -> Result<Turn> {
        let link_fd = self.link.as_raw_fd();
        let mut interests = Vec::with_capacity(2);
        interests.push(if self.outbound.is_empty() {
            Interest::readable(link_fd)
        } else {
            Interest::read_write(link_fd)
        });
        if let Some(console) = &self.console {
            interests.push(Interest::readable(console.as_raw_fd()));
        }

        let ready = poll_ready(&interests, self.config.poll_timeout)?;
        if ready.is_empty() {
            self.stats.timeouts += 1;
            info!(timeout = ?self.config.poll_timeout, "poll timed out");
            return Ok(Turn::TimedOut);
        }

        for readiness in ready {
            let origin = if readiness.fd == link_fd {
                SourceKind::Link
            } else {
                SourceKind::Console
            };
            self.service(origin, readiness)?;
        }
        Ok(Turn::Serviced)
    }

    fn service(&mut self, origin: SourceKind, readiness: Readiness) -> Result<()> {
        if readiness.error {
            warn!(source = %origin, "error condition on source");
            return Err(ReactorError::SourceError { origin });
        }
        if readiness.readable {
            let byte = match origin {
                SourceKind::Link => read_byte(&mut self.link, origin)?,
                SourceKind::Console => match self.console.as_mut() {
                    Some(console) => read_byte(console, origin)?,
                    None => None,
                },
            };
            if let Some(byte) = byte {
                self.stats.bytes_read += 1;
                self.process_byte(byte);
            }
        }
        if readiness.writable && origin == SourceKind::Link {
            self.flush_outbound()?;
        }
        Ok(())
    }

    fn process_byte(&mut self, byte: u8) {
        trace!(byte = format_args!("{byte:#04x}"), state = ?self.assembler.state(), "byte");
        if !self.assembler.push(byte) {
            return;
        }
        let Some(frame) = self.assembler.take() else {
            return;
        };
        self.stats.frames_completed += 1;

        match frame.verify() {
            Ok(()) => {
                debug!(
                    frame_type = ?frame.frame_type(),
                    frame_id = ?frame.frame_id(),
                    length = frame.length(),
                    "frame complete"
                );
                match self.handlers.route(frame) {
                    Dispatch::Dropped => self.stats.frames_unrouted += 1,
                    Dispatch::Handler(_) | Dispatch::Default => self.stats.frames_dispatched += 1,
                }
            }
            Err(FrameError::ChecksumMismatch { expected, actual }) => {
                self.stats.checksum_failures += 1;
                warn!(
                    expected = format_args!("{expected:#04x}"),
                    actual = format_args!("{actual:#04x}"),
                    frame_type = ?frame.frame_type(),
                    "bad checksum, discarding frame"
                );
            }
            Err(err) => warn!(error = %err, "discarding frame"),
        }
    }

    fn flush_outbound(&mut self) -> Result<()> {
        let origin = SourceKind::Link;
        while !self.outbound.is_empty() {
            match self.link.write(&self.outbound) {
                Ok(0) => {
                    return Err(ReactorError::Io {
                        origin,
                        error: ErrorKind::WriteZero.into(),
                    })
                }
                Ok(n) => {
                    self.outbound.advance(n);
                    self.stats.bytes_written += n as u64;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(error) => return Err(ReactorError::Io { origin, error }),
            }
        }
        match self.link.flush() {
            Ok(()) => {}
            Err(err)
                if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {}
            Err(error) => return Err(ReactorError::Io { origin, error }),
        }
        trace!(pending = self.outbound.len(), "flushed outbound");
        Ok(())
    }
}

/// Read exactly one byte. `None` when the read would block or was
/// interrupted; zero bytes read is end of stream.
fn read_byte<R: Read + ?Sized>(source: &mut R, origin: SourceKind) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    match source.read(&mut byte) {
        Ok(0) => {
            info!(source = %origin, "end of stream");
            Err(ReactorError::EndOfStream { origin })
        }
        Ok(_) => Ok(Some(byte[0])),
        Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
            Ok(None)
        }
        Err(error) => Err(ReactorError::Io { origin, error }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::os::fd::RawFd;
    use std::os::unix::net::UnixStream;
    use std::sync::mpsc::Receiver;

    use zbmgr_frame::{CommandName, FrameBuilder};

    use super::*;

    const ND_WIRE: [u8; 8] = [0x7E, 0x00, 0x04, 0x08, 0x01, 0x4E, 0x44, 0x64];

    fn reactor_pair() -> (Reactor<UnixStream>, UnixStream) {
        let (link, peer) = UnixStream::pair().unwrap();
        let config = ReactorConfig {
            poll_timeout: Duration::from_millis(200),
            ..ReactorConfig::default()
        };
        (Reactor::with_config(link, config), peer)
    }

    /// Turn until `rx` yields a frame.
    fn turn_until_frame(reactor: &mut Reactor<UnixStream>, rx: &Receiver<Frame>) -> Frame {
        for _ in 0..256 {
            reactor.turn().unwrap();
            if let Ok(frame) = rx.try_recv() {
                return frame;
            }
        }
        panic!("no frame dispatched");
    }

    #[test]
    fn dispatches_frame_to_default_handler() {
        let (mut reactor, mut peer) = reactor_pair();
        let rx = reactor.handlers().register_default();

        peer.write_all(&[0x7E, 0x00, 0x02, 0x08, 0x01, 0xF6]).unwrap();
        let frame = turn_until_frame(&mut reactor, &rx);

        assert!(frame.is_valid());
        assert_eq!(frame.frame_id(), Some(1));
        let stats = reactor.stats();
        assert_eq!(stats.bytes_read, 6);
        assert_eq!(stats.frames_dispatched, 1);
    }

    #[test]
    fn one_byte_per_turn() {
        let (mut reactor, mut peer) = reactor_pair();
        let _rx = reactor.handlers().register_default();

        peer.write_all(&ND_WIRE).unwrap();
        assert_eq!(reactor.turn().unwrap(), Turn::Serviced);
        assert_eq!(reactor.stats().bytes_read, 1);
        assert_eq!(reactor.turn().unwrap(), Turn::Serviced);
        assert_eq!(reactor.stats().bytes_read, 2);
    }

    #[test]
    fn routes_by_frame_id() {
        let (mut reactor, mut peer) = reactor_pair();
        let default = reactor.handlers().register_default();
        let seven = reactor.handlers().register(7);

        // Local command response, frame ID 7, then a modem status.
        let response = Frame::from_payload(&[0x88, 0x07, b'N', b'D', 0x00]).unwrap();
        let status = Frame::from_payload(&[0x8A, 0x07]).unwrap();
        peer.write_all(&response.encode(true)).unwrap();
        peer.write_all(&status.encode(true)).unwrap();

        let routed = turn_until_frame(&mut reactor, &seven);
        assert_eq!(routed.frame_type(), Some(0x88));
        let unsolicited = turn_until_frame(&mut reactor, &default);
        assert_eq!(unsolicited.frame_type(), Some(0x8A));
    }

    #[test]
    fn frames_arrive_in_wire_order() {
        let (mut reactor, mut peer) = reactor_pair();
        let rx = reactor.handlers().register_default();

        let mut builder = FrameBuilder::new();
        let command = Command::local(CommandName::new("ND").unwrap(), None);
        for _ in 0..20 {
            let wire = builder.build_wire(&command, None).unwrap();
            peer.write_all(&wire).unwrap();
        }

        for expected in 1..=20u8 {
            assert_eq!(turn_until_frame(&mut reactor, &rx).frame_id(), Some(expected));
        }
    }

    #[test]
    fn bad_checksum_is_counted_not_dispatched() {
        let (mut reactor, mut peer) = reactor_pair();
        let rx = reactor.handlers().register_default();

        let mut corrupted = ND_WIRE;
        corrupted[7] ^= 0x01;
        peer.write_all(&corrupted).unwrap();
        peer.write_all(&ND_WIRE).unwrap();

        let frame = turn_until_frame(&mut reactor, &rx);
        assert!(frame.is_valid());
        let stats = reactor.stats();
        assert_eq!(stats.checksum_failures, 1);
        assert_eq!(stats.frames_completed, 2);
        assert_eq!(stats.frames_dispatched, 1);
    }

    #[test]
    fn stray_bytes_are_dropped() {
        let (mut reactor, mut peer) = reactor_pair();
        let rx = reactor.handlers().register_default();

        peer.write_all(&[0x41]).unwrap();
        peer.write_all(&ND_WIRE).unwrap();

        assert!(turn_until_frame(&mut reactor, &rx).is_valid());
        assert_eq!(reactor.stats().dropped_bytes, 1);
    }

    #[test]
    fn unrouted_frames_are_counted() {
        let (mut reactor, mut peer) = reactor_pair();
        peer.write_all(&ND_WIRE).unwrap();

        for _ in 0..ND_WIRE.len() {
            reactor.turn().unwrap();
        }
        assert_eq!(reactor.stats().frames_unrouted, 1);
    }

    #[test]
    fn idle_link_times_out() {
        let (link, _peer) = UnixStream::pair().unwrap();
        let config = ReactorConfig {
            poll_timeout: Duration::from_millis(10),
            ..ReactorConfig::default()
        };
        let mut reactor = Reactor::with_config(link, config);

        assert_eq!(reactor.turn().unwrap(), Turn::TimedOut);
        assert_eq!(reactor.stats().timeouts, 1);
    }

    #[test]
    fn end_of_stream_is_fatal() {
        let (mut reactor, peer) = reactor_pair();
        drop(peer);

        let err = reactor.turn().unwrap_err();
        assert!(matches!(
            err,
            ReactorError::EndOfStream {
                origin: SourceKind::Link
            }
        ));
    }

    #[test]
    fn queued_command_is_written_when_writable() {
        let (mut reactor, mut peer) = reactor_pair();
        let command = Command::local(CommandName::new("ND").unwrap(), None);

        let frame = reactor.send_command(&command, None).unwrap();
        assert_eq!(frame.frame_id(), Some(1));
        assert_eq!(reactor.pending_output(), ND_WIRE.len());

        assert_eq!(reactor.turn().unwrap(), Turn::Serviced);
        assert_eq!(reactor.pending_output(), 0);
        assert_eq!(reactor.stats().bytes_written, ND_WIRE.len() as u64);

        let mut wire = [0u8; 8];
        peer.read_exact(&mut wire).unwrap();
        assert_eq!(wire, ND_WIRE);
    }

    #[test]
    fn console_bytes_feed_the_same_assembler() {
        let (link, mut peer) = UnixStream::pair().unwrap();
        let (console, mut operator) = UnixStream::pair().unwrap();
        let config = ReactorConfig {
            poll_timeout: Duration::from_millis(200),
            ..ReactorConfig::default()
        };
        let mut reactor = Reactor::with_config(link, config).with_console(console);
        let rx = reactor.handlers().register_default();

        // Half a frame from the link, the rest typed on the console.
        peer.write_all(&ND_WIRE[..4]).unwrap();
        for _ in 0..4 {
            reactor.turn().unwrap();
        }
        operator.write_all(&ND_WIRE[4..]).unwrap();

        let frame = turn_until_frame(&mut reactor, &rx);
        assert_eq!(frame.frame_id(), Some(1));
    }

    #[test]
    fn console_end_of_stream_is_fatal() {
        let (link, _peer) = UnixStream::pair().unwrap();
        let (console, operator) = UnixStream::pair().unwrap();
        let mut reactor = Reactor::new(link).with_console(console);
        drop(operator);

        let err = reactor.turn().unwrap_err();
        assert!(matches!(
            err,
            ReactorError::EndOfStream {
                origin: SourceKind::Console
            }
        ));
    }

    #[test]
    fn error_readiness_is_fatal() {
        let (link, _peer) = UnixStream::pair().unwrap();
        let mut reactor = Reactor::new(link).with_console(ClosedSource);

        let err = reactor.turn().unwrap_err();
        assert!(matches!(
            err,
            ReactorError::SourceError {
                origin: SourceKind::Console
            }
        ));
    }

    #[test]
    fn run_returns_when_stop_flag_is_set() {
        let (link, _peer) = UnixStream::pair().unwrap();
        let stop = Arc::new(AtomicBool::new(true));
        let mut reactor = Reactor::new(link).with_stop_flag(Arc::clone(&stop));

        reactor.run().unwrap();
        assert!(reactor.stop_handle().load(Ordering::SeqCst));
    }

    #[test]
    fn run_stops_on_end_of_stream() {
        let (mut reactor, mut peer) = reactor_pair();
        let rx = reactor.handlers().register_default();

        peer.write_all(&ND_WIRE).unwrap();
        drop(peer);

        assert!(matches!(
            reactor.run(),
            Err(ReactorError::EndOfStream { .. })
        ));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn unescaped_link() {
        let (link, mut peer) = UnixStream::pair().unwrap();
        let config = ReactorConfig {
            frame: FrameConfig {
                escaped: false,
                ..FrameConfig::default()
            },
            ..ReactorConfig::default()
        };
        let mut reactor = Reactor::with_config(link, config);
        let rx = reactor.handlers().register_default();

        peer.write_all(&[0x7E, 0x00, 0x02, 0x08, 0x11, 0xE6]).unwrap();
        assert_eq!(turn_until_frame(&mut reactor, &rx).frame_id(), Some(0x11));
    }

    #[test]
    fn stats_serialize() {
        let (reactor, _peer) = reactor_pair();
        let json = serde_json::to_value(reactor.stats()).unwrap();
        assert_eq!(json["frames_dispatched"], 0);
        assert_eq!(json["timeouts"], 0);
    }

    /// A source whose descriptor is not open, so poll reports it invalid.
    struct ClosedSource;

    impl Read for ClosedSource {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    impl AsRawFd for ClosedSource {
        fn as_raw_fd(&self) -> RawFd {
            1_000_000
        }
    }
}
