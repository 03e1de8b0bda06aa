use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum;
use crate::error::{FrameError, Result};
use crate::escape::{self, DELIMITER};
use crate::frame_type;

/// Frame header: delimiter (1) + length (2) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Trailing checksum byte.
pub const CHECKSUM_SIZE: usize = 1;

/// Default maximum payload size: whatever the 16-bit length field can carry.
pub const DEFAULT_MAX_PAYLOAD: usize = u16::MAX as usize;

/// Where a frame is in its byte-by-byte assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    /// Waiting for a delimiter.
    Empty,
    /// Delimiter seen, reading the two length bytes.
    AwaitingLength,
    /// Reading payload bytes.
    AwaitingBody,
    /// Payload complete, the next byte is the checksum.
    AwaitingChecksum,
    /// Checksum byte consumed. Terminal.
    Complete,
}

/// One API frame, held in its unescaped form.
///
/// Unescaped wire format:
/// ```text
/// ┌───────────┬──────────────┬────────────┬──────────┬─────────────────┬──────────┐
/// │ Delimiter │ Length       │ Frame type │ Frame ID │ Type-specific   │ Checksum │
/// │ 0x7E      │ (2B BE)      │ (1B)       │ (1B)     │ fields          │ (1B)     │
/// └───────────┴──────────────┴────────────┴──────────┴─────────────────┴──────────┘
///              └──────────── Length covers these ───────────────────┘
/// ```
/// On the wire in escaped mode everything after the delimiter is byte-stuffed.
#[derive(Debug, Clone)]
pub struct Frame {
    pub(crate) raw: BytesMut,
    pub(crate) length: u16,
    pub(crate) state: AssemblyState,
    pub(crate) valid: bool,
}

impl Frame {
    /// An empty frame, ready to be assembled.
    pub fn new() -> Self {
        Self {
            raw: BytesMut::new(),
            length: 0,
            state: AssemblyState::Empty,
            valid: false,
        }
    }

    /// Build a complete, valid frame around `payload` (frame type onwards).
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let length = u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
            size: payload.len(),
            max: DEFAULT_MAX_PAYLOAD,
        })?;

        let mut raw = BytesMut::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
        raw.put_u8(DELIMITER);
        raw.put_u16(length);
        raw.put_slice(payload);
        raw.put_u8(checksum::compute(payload));

        Ok(Self {
            raw,
            length,
            state: AssemblyState::Complete,
            valid: true,
        })
    }

    /// The unescaped bytes buffered so far, delimiter included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Declared payload length. Zero until both length bytes have arrived.
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == AssemblyState::Complete
    }

    /// True only for a complete frame whose checksum matched.
    pub fn is_valid(&self) -> bool {
        self.is_complete() && self.valid
    }

    /// Payload bytes received so far (frame type onwards, checksum excluded).
    pub fn payload(&self) -> &[u8] {
        if self.raw.len() <= HEADER_SIZE {
            return &[];
        }
        let end = (HEADER_SIZE + self.length as usize).min(self.raw.len());
        &self.raw[HEADER_SIZE..end]
    }

    /// The frame type byte, once it has arrived.
    pub fn frame_type(&self) -> Option<u8> {
        self.payload().first().copied()
    }

    /// The correlation ID, for frame types that carry one.
    pub fn frame_id(&self) -> Option<u8> {
        let frame_type = self.frame_type()?;
        if !frame_type::carries_frame_id(frame_type) {
            return None;
        }
        self.payload().get(1).copied()
    }

    /// The received checksum byte of a complete frame.
    pub fn checksum(&self) -> Option<u8> {
        if self.is_complete() {
            self.raw.last().copied()
        } else {
            None
        }
    }

    /// The checksum the payload of a complete frame should have carried.
    pub fn expected_checksum(&self) -> Option<u8> {
        if self.is_complete() {
            Some(checksum::compute(self.payload()))
        } else {
            None
        }
    }

    /// `Ok` for a complete frame with a matching checksum.
    pub fn verify(&self) -> Result<()> {
        match (self.expected_checksum(), self.checksum()) {
            (Some(expected), Some(actual)) if expected == actual => Ok(()),
            (Some(expected), Some(actual)) => Err(FrameError::ChecksumMismatch { expected, actual }),
            _ => Err(FrameError::Incomplete),
        }
    }

    /// Encode the frame for the wire.
    pub fn encode(&self, escaped: bool) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.raw.len() * 2);
        self.encode_into(escaped, &mut dst);
        dst.freeze()
    }

    /// Append the wire form of this frame to `dst`.
    ///
    /// The leading delimiter is never escaped; in escaped mode every byte
    /// after it is.
    pub fn encode_into(&self, escaped: bool, dst: &mut BytesMut) {
        let Some((&first, rest)) = self.raw.split_first() else {
            return;
        };
        dst.put_u8(first);
        if escaped {
            escape::escape_into(rest, dst);
        } else {
            dst.put_slice(rest);
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::dump::hexdump(&self.raw, 16, None))
    }
}

/// Configuration for frame assembly and encoding.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Byte-stuff everything after the delimiter (escaped API mode). Default: true.
    pub escaped: bool,
    /// Frames declaring a longer payload are dropped. Default: 65535.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            escaped: true,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
