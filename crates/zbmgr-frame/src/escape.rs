//! XOR-0x20 byte stuffing for the escaped API mode.
//!
//! Four byte values are structural on the wire. Inside a frame each of them
//! is sent as [`ESCAPE`] followed by the value XOR [`ESCAPE_XOR`].

use bytes::{BufMut, BytesMut};

/// Frame delimiter. Never escaped when it starts a frame.
pub const DELIMITER: u8 = 0x7E;
/// Escape marker.
pub const ESCAPE: u8 = 0x7D;
/// Software flow control: resume.
pub const XON: u8 = 0x11;
/// Software flow control: pause.
pub const XOFF: u8 = 0x13;
/// Value XORed into an escaped byte.
pub const ESCAPE_XOR: u8 = 0x20;

/// The byte values that must be escaped inside a frame.
pub const RESERVED: [u8; 4] = [DELIMITER, ESCAPE, XON, XOFF];

/// Returns true if `byte` has to be escaped on the wire.
pub fn needs_escape(byte: u8) -> bool {
    RESERVED.contains(&byte)
}

/// Append the escaped form of `src` to `dst`.
pub fn escape_into(src: &[u8], dst: &mut BytesMut) {
    dst.reserve(src.len());
    for &byte in src {
        if needs_escape(byte) {
            dst.put_u8(ESCAPE);
            dst.put_u8(byte ^ ESCAPE_XOR);
        } else {
            dst.put_u8(byte);
        }
    }
}

/// Escape a whole buffer.
pub fn escape(src: &[u8]) -> BytesMut {
    let mut dst = BytesMut::with_capacity(src.len());
    escape_into(src, &mut dst);
    dst
}

/// Unescape a whole buffer. A trailing lone escape byte is dropped.
pub fn unescape(src: &[u8]) -> BytesMut {
    let mut unescaper = Unescaper::new();
    let mut dst = BytesMut::with_capacity(src.len());
    for &byte in src {
        if let Some(out) = unescaper.push(byte) {
            dst.put_u8(out);
        }
    }
    dst
}

/// Streaming decoder carrying the "last byte was escape" flag between bytes.
#[derive(Debug, Default, Clone)]
pub struct Unescaper {
    last_was_escape: bool,
}

impl Unescaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one wire byte into zero or one payload byte.
    pub fn push(&mut self, byte: u8) -> Option<u8> {
        if self.last_was_escape {
            self.last_was_escape = false;
            return Some(byte ^ ESCAPE_XOR);
        }
        if byte == ESCAPE {
            self.last_was_escape = true;
            return None;
        }
        Some(byte)
    }

    /// True when the previous byte was an escape marker.
    pub fn is_pending(&self) -> bool {
        self.last_was_escape
    }

    pub fn reset(&mut self) {
        self.last_was_escape = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bytes_are_stuffed() {
        let escaped = escape(&[0x7E, 0x7D, 0x11, 0x13]);
        assert_eq!(
            escaped.as_ref(),
            &[0x7D, 0x5E, 0x7D, 0x5D, 0x7D, 0x31, 0x7D, 0x33]
        );
    }

    #[test]
    fn ordinary_bytes_pass_through() {
        assert_eq!(escape(b"ND").as_ref(), b"ND");
        assert_eq!(unescape(b"ND").as_ref(), b"ND");
    }

    #[test]
    fn every_byte_value_roundtrips() {
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(unescape(&escape(&all)).as_ref(), all.as_slice());
    }

    #[test]
    fn escape_flag_carries_across_pushes() {
        let mut unescaper = Unescaper::new();
        assert_eq!(unescaper.push(ESCAPE), None);
        assert!(unescaper.is_pending());

        assert_eq!(unescaper.push(0x5E), Some(DELIMITER));
        assert!(!unescaper.is_pending());
        assert_eq!(unescaper.push(0x41), Some(0x41));
    }

    #[test]
    fn trailing_escape_is_dropped() {
        assert_eq!(unescape(&[0x41, ESCAPE]).as_ref(), &[0x41]);
    }
}
