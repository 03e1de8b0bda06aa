use bytes::BufMut;
use tracing::{trace, warn};

use crate::checksum;
use crate::codec::{AssemblyState, Frame, FrameConfig, CHECKSUM_SIZE, HEADER_SIZE};
use crate::escape::{Unescaper, DELIMITER};

/// Byte-driven frame assembly state machine.
///
/// Consumes raw wire bytes one at a time, unescapes them (in escaped mode)
/// and builds up a [`Frame`]. Once the checksum byte has been consumed the
/// frame is `Complete` and further input is ignored until it is taken with
/// [`FrameAssembler::take`] or discarded with [`FrameAssembler::reset`].
///
/// Bytes that arrive while waiting for a delimiter are dropped with a
/// diagnostic. A stream that never contains a delimiter is dropped forever;
/// [`FrameAssembler::dropped_bytes`] counts the losses.
#[derive(Debug)]
pub struct FrameAssembler {
    frame: Frame,
    unescaper: Unescaper,
    config: FrameConfig,
    dropped: u64,
}

impl FrameAssembler {
    /// Create an assembler with default configuration (escaped mode).
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an assembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            frame: Frame::new(),
            unescaper: Unescaper::new(),
            config,
            dropped: 0,
        }
    }

    /// Feed one wire byte. Returns true when this byte completed the frame.
    pub fn push(&mut self, byte: u8) -> bool {
        match self.frame.state {
            AssemblyState::Complete => {
                trace!(byte, "ignoring byte after complete frame");
                return false;
            }
            AssemblyState::Empty => {
                if byte == DELIMITER {
                    self.frame.raw.put_u8(byte);
                    self.frame.state = AssemblyState::AwaitingLength;
                } else {
                    self.dropped += 1;
                    warn!(byte = format_args!("{byte:#04x}"), "dropping byte outside frame");
                }
                return false;
            }
            _ => {}
        }

        let byte = if self.config.escaped {
            match self.unescaper.push(byte) {
                Some(byte) => byte,
                None => return false,
            }
        } else {
            byte
        };

        self.frame.raw.put_u8(byte);
        let buffered = self.frame.raw.len();
        let length = self.frame.length as usize;

        match self.frame.state {
            AssemblyState::AwaitingLength if buffered == HEADER_SIZE => {
                let declared = u16::from_be_bytes([self.frame.raw[1], self.frame.raw[2]]);
                if declared as usize > self.config.max_payload_size {
                    warn!(
                        length = declared,
                        max = self.config.max_payload_size,
                        "dropping frame with oversized length"
                    );
                    self.dropped += buffered as u64;
                    self.reset();
                    return false;
                }
                self.frame.length = declared;
                self.frame.state = if declared == 0 {
                    AssemblyState::AwaitingChecksum
                } else {
                    AssemblyState::AwaitingBody
                };
            }
            AssemblyState::AwaitingBody if buffered == HEADER_SIZE + length => {
                self.frame.state = AssemblyState::AwaitingChecksum;
            }
            AssemblyState::AwaitingChecksum if buffered == HEADER_SIZE + length + CHECKSUM_SIZE => {
                self.frame.valid = checksum::is_valid(&self.frame.raw[HEADER_SIZE..]);
                self.frame.state = AssemblyState::Complete;
                return true;
            }
            _ => {}
        }
        false
    }

    /// Feed a buffer byte by byte. Returns true if a frame completed during
    /// this call; bytes following the completing byte are ignored.
    pub fn assemble(&mut self, buf: &[u8]) -> bool {
        let mut completed = false;
        for &byte in buf {
            completed |= self.push(byte);
        }
        completed
    }

    /// Feed bytes until a frame completes. Returns how many bytes of `buf`
    /// were consumed, so the caller can keep the rest for the next frame.
    pub fn feed(&mut self, buf: &[u8]) -> usize {
        for (index, &byte) in buf.iter().enumerate() {
            if self.is_complete() {
                return index;
            }
            self.push(byte);
        }
        buf.len()
    }

    pub fn state(&self) -> AssemblyState {
        self.frame.state
    }

    pub fn is_complete(&self) -> bool {
        self.frame.is_complete()
    }

    /// The frame being assembled.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Hand out the completed frame and start over with an empty one.
    pub fn take(&mut self) -> Option<Frame> {
        if !self.is_complete() {
            return None;
        }
        self.unescaper.reset();
        Some(std::mem::take(&mut self.frame))
    }

    /// Discard whatever has been assembled so far.
    pub fn reset(&mut self) {
        self.frame = Frame::new();
        self.unescaper.reset();
    }

    /// Bytes dropped while waiting for a delimiter or with oversized frames.
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped
    }

    /// Current assembler configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;

    const LOCAL_COMMAND_FRAME: [u8; 6] = [0x7E, 0x00, 0x02, 0x08, 0x01, 0xF6];

    #[test]
    fn assembles_minimal_local_command() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.assemble(&LOCAL_COMMAND_FRAME));

        let frame = assembler.take().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.length(), 2);
        assert_eq!(frame.frame_type(), Some(0x08));
        assert_eq!(frame.frame_id(), Some(0x01));
        assert_eq!(frame.payload(), &[0x08, 0x01]);
        assert_eq!(assembler.state(), AssemblyState::Empty);
    }

    #[test]
    fn walks_through_states() {
        let mut assembler = FrameAssembler::new();
        assert_eq!(assembler.state(), AssemblyState::Empty);

        assembler.push(0x7E);
        assert_eq!(assembler.state(), AssemblyState::AwaitingLength);
        assembler.push(0x00);
        assert_eq!(assembler.state(), AssemblyState::AwaitingLength);
        assembler.push(0x02);
        assert_eq!(assembler.state(), AssemblyState::AwaitingBody);
        assert_eq!(assembler.frame().length(), 2);
        assembler.push(0x08);
        assert_eq!(assembler.state(), AssemblyState::AwaitingBody);
        assembler.push(0x01);
        assert_eq!(assembler.state(), AssemblyState::AwaitingChecksum);
        assert!(assembler.push(0xF6));
        assert_eq!(assembler.state(), AssemblyState::Complete);
    }

    #[test]
    fn byte_at_a_time_matches_all_at_once() {
        let wire = Frame::from_payload(&[0x10, 0x05, 0x7E, 0x11, 0x13, 0x7D, b'h', b'i'])
            .unwrap()
            .encode(true);

        let mut whole = FrameAssembler::new();
        assert!(whole.assemble(&wire));

        let mut single = FrameAssembler::new();
        let completions = wire.iter().filter(|&&b| single.push(b)).count();
        assert_eq!(completions, 1);

        let a = whole.take().unwrap();
        let b = single.take().unwrap();
        assert_eq!(a.raw(), b.raw());
        assert_eq!(a.is_valid(), b.is_valid());
        assert!(a.is_valid());
    }

    #[test]
    fn unescapes_reserved_bytes() {
        let payload = [0x10, 0x05, 0x7E, 0x7D, 0x11, 0x13];
        let built = Frame::from_payload(&payload).unwrap();

        let mut assembler = FrameAssembler::new();
        assert!(assembler.assemble(&built.encode(true)));
        let frame = assembler.take().unwrap();

        assert_eq!(frame.raw(), built.raw());
        assert_eq!(frame.payload(), &payload);
        assert!(frame.is_valid());
    }

    #[test]
    fn unescaped_mode_takes_bytes_verbatim() {
        let config = FrameConfig {
            escaped: false,
            ..FrameConfig::default()
        };
        let built = Frame::from_payload(&[0x10, 0x05, 0x7D]).unwrap();

        let mut assembler = FrameAssembler::with_config(config);
        assert!(assembler.assemble(&built.encode(false)));
        assert_eq!(assembler.take().unwrap().payload(), &[0x10, 0x05, 0x7D]);
    }

    #[test]
    fn stray_byte_before_delimiter_is_dropped() {
        let mut assembler = FrameAssembler::new();
        let mut wire = vec![0x41];
        wire.extend_from_slice(&LOCAL_COMMAND_FRAME);

        assert!(assembler.assemble(&wire));
        assert_eq!(assembler.dropped_bytes(), 1);
        assert!(assembler.take().unwrap().is_valid());
    }

    #[test]
    fn stream_without_delimiter_is_dropped_silently_forever() {
        let mut assembler = FrameAssembler::new();
        let noise: Vec<u8> = (0..10_000u32).map(|i| (i % 0x7E) as u8).collect();

        assert!(!assembler.assemble(&noise));
        assert_eq!(assembler.state(), AssemblyState::Empty);
        assert_eq!(assembler.dropped_bytes(), 10_000);
        assert!(assembler.frame().raw().is_empty());
    }

    #[test]
    fn escaped_delimiter_does_not_start_frame() {
        let mut assembler = FrameAssembler::new();
        assert!(!assembler.assemble(&[0x7D, 0x5E]));
        assert_eq!(assembler.state(), AssemblyState::Empty);
        assert_eq!(assembler.dropped_bytes(), 2);
    }

    #[test]
    fn corrupted_checksum_completes_invalid() {
        let mut wire = LOCAL_COMMAND_FRAME;
        wire[5] ^= 0xFF;

        let mut assembler = FrameAssembler::new();
        assert!(assembler.assemble(&wire));
        let frame = assembler.take().unwrap();

        assert!(frame.is_complete());
        assert!(!frame.is_valid());
        assert!(matches!(
            frame.verify(),
            Err(FrameError::ChecksumMismatch {
                expected: 0xF6,
                actual: 0x09
            })
        ));
    }

    #[test]
    fn zero_length_frame_completes() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.assemble(&[0x7E, 0x00, 0x00, 0xFF]));
        let frame = assembler.take().unwrap();
        assert!(frame.is_valid());
        assert!(frame.payload().is_empty());
        assert_eq!(frame.frame_type(), None);
    }

    #[test]
    fn oversized_length_drops_frame() {
        let config = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut assembler = FrameAssembler::with_config(config);

        assert!(!assembler.assemble(&[0x7E, 0x00, 0x10]));
        assert_eq!(assembler.state(), AssemblyState::Empty);
        assert_eq!(assembler.dropped_bytes(), 3);

        assert!(assembler.assemble(&LOCAL_COMMAND_FRAME));
    }

    #[test]
    fn complete_frame_ignores_further_input() {
        let mut assembler = FrameAssembler::new();
        let mut wire = LOCAL_COMMAND_FRAME.to_vec();
        wire.extend_from_slice(&LOCAL_COMMAND_FRAME);

        assert!(assembler.assemble(&wire));
        assert_eq!(assembler.frame().raw(), &LOCAL_COMMAND_FRAME);
        assert!(!assembler.push(0x7E));
        assert_eq!(assembler.state(), AssemblyState::Complete);
    }

    #[test]
    fn feed_stops_after_completion() {
        let mut assembler = FrameAssembler::new();
        let mut wire = LOCAL_COMMAND_FRAME.to_vec();
        wire.extend_from_slice(&[0x7E, 0x00]);

        assert_eq!(assembler.feed(&wire), LOCAL_COMMAND_FRAME.len());
        assert!(assembler.is_complete());

        assembler.take();
        assert_eq!(assembler.feed(&wire[LOCAL_COMMAND_FRAME.len()..]), 2);
        assert_eq!(assembler.state(), AssemblyState::AwaitingLength);
    }

    #[test]
    fn take_before_completion_returns_none() {
        let mut assembler = FrameAssembler::new();
        assembler.assemble(&[0x7E, 0x00]);
        assert!(assembler.take().is_none());

        assembler.reset();
        assert_eq!(assembler.state(), AssemblyState::Empty);
    }
}
